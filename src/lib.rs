//! sqlmake: derive a Makefile from the tables a directory of SQL scripts
//! creates and reads.

pub mod commands;
pub mod logging;
pub mod sql_engine;
