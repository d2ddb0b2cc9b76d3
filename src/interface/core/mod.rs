pub mod runnable;
