use std::net::SocketAddr;

use tokio::{io::AsyncWriteExt, net::TcpStream};

use super::{line_protocol, send_with_retry, PointBuffer, PointSink, RetryPolicy, SinkError};
use crate::point::Point;

/// Line protocol over a plain TCP socket (QuestDB and other ILP listeners).
///
/// Every batch goes out on a fresh connection; the listener gives no
/// acknowledgement, so a successful write and shutdown is all that is
/// checked.
pub struct IlpTcpSink {
    addr: SocketAddr,
    batch_size: usize,
    retry: RetryPolicy,
    buffer: PointBuffer,
}

impl IlpTcpSink {
    pub fn new(addr: SocketAddr, batch_size: usize, retry: RetryPolicy) -> Self {
        Self {
            addr,
            batch_size: batch_size.max(1),
            retry,
            buffer: PointBuffer::default(),
        }
    }

    async fn connect(addr: SocketAddr) -> Result<TcpStream, SinkError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| SinkError::Connect(format!("failed to connect to ILP listener {addr}: {e}")))?;
        let _ = stream.set_nodelay(true);
        Ok(stream)
    }

    async fn send_payload(addr: SocketAddr, payload: &[u8]) -> Result<(), SinkError> {
        let mut stream = Self::connect(addr).await?;
        stream.write_all(payload).await?;
        stream.shutdown().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PointSink for IlpTcpSink {
    fn write(&self, point: Point) {
        self.buffer.push(point);
    }

    async fn flush(&self) -> Result<(), SinkError> {
        let points = self.buffer.take();
        for batch in points.chunks(self.batch_size) {
            let (payload, lines) = line_protocol::encode_batch(batch);
            if lines == 0 {
                continue;
            }

            let addr = self.addr;
            let payload = payload.as_bytes();
            send_with_retry(self.retry, "ilp_tcp", lines, || Self::send_payload(addr, payload)).await?;
        }
        Ok(())
    }
}
