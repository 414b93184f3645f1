pub mod config;
pub mod config_gen;
pub mod configurators;
pub mod mods;
pub mod runner;
pub mod steamcmd;
pub mod storage;
