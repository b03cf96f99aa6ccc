mod graph_tests;
mod makefile_tests;
