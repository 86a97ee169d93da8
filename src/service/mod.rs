pub mod dispatch;
pub mod model;
pub mod openai_service;
pub mod resolver;
pub mod routing;
pub mod temporal;
