pub mod gateway;

pub use gateway::{ApiGateway, HttpApiGateway, RequestOptions};
