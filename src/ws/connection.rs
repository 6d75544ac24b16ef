//! An exclusively owned WebSocket connection over an upgraded stream.

use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use super::{Frame, FrameCodec, WebSocketError};

/// Owns one upgraded stream and its frame codec. One frame is fully read or
/// written per call; every write is flushed before returning.
pub struct Connection<S> {
    framed: Framed<S, FrameCodec>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            framed: Framed::new(stream, FrameCodec),
        }
    }

    pub async fn read_frame(&mut self) -> Result<Frame, WebSocketError> {
        self.framed
            .next()
            .await
            .ok_or(WebSocketError::ConnectionClosed)?
    }

    pub async fn write_frame(&mut self, frame: Frame) -> Result<(), WebSocketError> {
        self.framed.send(frame).await
    }

    /// Send a Close frame and drop the stream.
    pub async fn close(mut self) -> Result<(), WebSocketError> {
        self.framed.send(Frame::close()).await?;
        self.framed.close().await
    }

    /// Split into independent reader and writer halves so the client's read
    /// and write pumps can run as separate tasks.
    pub fn into_split(self) -> (ConnectionReader<S>, ConnectionWriter<S>) {
        let (sink, stream) = self.framed.split();
        (ConnectionReader { stream }, ConnectionWriter { sink })
    }
}

pub struct ConnectionReader<S> {
    stream: SplitStream<Framed<S, FrameCodec>>,
}

impl<S> ConnectionReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub async fn read_frame(&mut self) -> Result<Frame, WebSocketError> {
        self.stream
            .next()
            .await
            .ok_or(WebSocketError::ConnectionClosed)?
    }
}

pub struct ConnectionWriter<S> {
    sink: SplitSink<Framed<S, FrameCodec>, Frame>,
}

impl<S> ConnectionWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub async fn write_frame(&mut self, frame: Frame) -> Result<(), WebSocketError> {
        self.sink.send(frame).await
    }

    /// Send a Close frame, then shut the write side down.
    pub async fn close(mut self) -> Result<(), WebSocketError> {
        self.sink.send(Frame::close()).await?;
        self.sink.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::OpCode;

    #[tokio::test]
    async fn frames_cross_an_in_memory_stream() {
        let (left, right) = tokio::io::duplex(1024);
        let mut server = Connection::new(left);
        let mut peer = Connection::new(right);

        server.write_frame(Frame::text("welcome")).await.unwrap();
        let frame = peer.read_frame().await.unwrap();
        assert_eq!(frame.opcode, OpCode::Text);
        assert_eq!(frame.payload.as_ref(), b"welcome");

        peer.write_frame(Frame::ping("beat")).await.unwrap();
        let frame = server.read_frame().await.unwrap();
        assert_eq!(frame.opcode, OpCode::Ping);
        assert_eq!(frame.payload.as_ref(), b"beat");
    }

    #[tokio::test]
    async fn close_sends_a_close_frame_before_dropping() {
        let (left, right) = tokio::io::duplex(1024);
        let server = Connection::new(left);
        let mut peer = Connection::new(right);

        server.close().await.unwrap();
        let frame = peer.read_frame().await.unwrap();
        assert_eq!(frame.opcode, OpCode::Close);
        assert!(matches!(
            peer.read_frame().await,
            Err(WebSocketError::ConnectionClosed)
        ));
    }
}
