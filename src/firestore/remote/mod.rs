pub mod commit;
pub mod connection;
pub mod http;
pub mod rpc_error;
pub mod serializer;
pub mod transport;

pub use commit::{demultiplex_write_results, should_begin_transaction};
pub use connection::{Connection, ConnectionBuilder, RequestContext};
pub use http::{HttpTransport, HttpTransportBuilder, RetrySettings};
pub use serializer::{CommitResponse, JsonProtoSerializer};
pub use transport::{
    request_tag, NoopTokenProvider, RpcMethod, RpcTransport, RpcTransportArc, TokenProvider,
    TokenProviderArc,
};
