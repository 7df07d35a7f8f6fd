pub mod feed_store;
