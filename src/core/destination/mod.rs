pub mod destination_sync;
