pub mod sentiments;
