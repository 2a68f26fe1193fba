pub mod domain;
pub mod gql;

pub use domain::ProviderResponse;
pub use gql::{
    ClientError, GraphqlClient, QueryExecutor, CONSUMPTION_LOOKBACK, DEFAULT_ENDPOINT, HOMES_QUERY,
};
