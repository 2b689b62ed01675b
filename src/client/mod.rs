pub mod http;

pub use http::HttpAnswerProvider;
