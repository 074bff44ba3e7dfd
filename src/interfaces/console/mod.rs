pub mod update_writer;
