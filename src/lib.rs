pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{DataSourceError, HttpDataSource, MockDataSource, PortfolioSource, PriceSource};
pub use domain::{
    Address, GlobalCurrency, Network, Pool, PoolKey, Position, PositionRecord, Token, TokenAmount,
    TokenRegistry, Transaction, TxType,
};
pub use engine::{derive_portfolio, AggregationSettings, NetworkInput, Portfolio, PriceSnapshot};
pub use error::AppError;
