pub mod ingestion_loop;
