//! What the client and the manager say to each other.
//!
//! One request and one reply per connection. Every frame is a 4-byte
//! big-endian length followed by a MessagePack body.

use ring::{DataPoint, MembershipChange, RingError, Snapshot};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Frames larger than this are refused before anything is allocated.
pub const MAX_FRAME: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Request {
    AddNode,
    RemoveNode,
    AddData { key: String, value: String },
    /// Let the manager invent the key and value.
    GenerateData,
    StartAuto,
    StopAuto,
    Reset,
    Status,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Reply {
    NodeAdded(MembershipChange),
    NodeRemoved(MembershipChange),
    DataAdded(DataPoint),
    Rejected(RingError),
    Auto { running: bool },
    Status { snapshot: Snapshot, auto_running: bool },
    Done,
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("frame of {0} bytes exceeds the {MAX_FRAME} byte limit")]
    FrameTooLarge(usize),
}

pub async fn send_msg<W, M>(conn: &mut W, msg: &M) -> Result<()>
where
    W: AsyncWrite + Unpin,
    M: Serialize + std::fmt::Debug,
{
    let body = rmp_serde::to_vec(msg)?;
    if body.len() > MAX_FRAME {
        return Err(Error::FrameTooLarge(body.len()));
    }
    trace!(bytes = body.len(), ?msg, "sending frame");
    // Length fits: MAX_FRAME < u32::MAX.
    conn.write_u32(body.len() as u32).await?;
    conn.write_all(&body).await?;
    conn.flush().await?;

    Ok(())
}

pub async fn recv_msg<R, M>(conn: &mut R) -> Result<M>
where
    R: AsyncRead + Unpin,
    M: DeserializeOwned + std::fmt::Debug,
{
    let len = conn.read_u32().await? as usize;
    if len > MAX_FRAME {
        return Err(Error::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len];
    conn.read_exact(&mut body).await?;
    let message = rmp_serde::from_slice(&body)?;
    trace!(bytes = len, ?message, "got frame");

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::{Engine, RingConfig};
    use tokio::net::{TcpListener, TcpStream};

    fn snapshot() -> Snapshot {
        let mut engine = Engine::new(RingConfig {
            seed: Some(17),
            ..Default::default()
        })
        .expect("default config is valid");
        for _ in 0..20 {
            engine.generate_data_point().expect("ring has nodes");
        }
        engine.snapshot()
    }

    #[tokio::test]
    async fn request_and_reply_cross_a_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let expected = snapshot();

        let served = expected.clone();
        let server = tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();
            let req: Request = recv_msg(&mut conn).await.unwrap();
            assert_eq!(req, Request::Status);
            let reply = Reply::Status {
                snapshot: served,
                auto_running: true,
            };
            send_msg(&mut conn, &reply).await.unwrap();
        });

        let mut conn = TcpStream::connect(addr).await.unwrap();
        send_msg(&mut conn, &Request::Status).await.unwrap();
        let reply: Reply = recv_msg(&mut conn).await.unwrap();
        server.await.unwrap();

        assert_eq!(
            reply,
            Reply::Status {
                snapshot: expected,
                auto_running: true
            }
        );
    }

    #[tokio::test]
    async fn back_to_back_frames_stay_separate() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let msgs = [
            Request::AddNode,
            Request::AddData {
                key: "professionalism".into(),
                value: "mayreflectwell".into(),
            },
            Request::Reset,
        ];
        for msg in &msgs {
            send_msg(&mut a, msg).await.unwrap();
        }
        for msg in msgs {
            let got: Request = recv_msg(&mut b).await.unwrap();
            assert_eq!(got, msg);
        }
    }

    #[tokio::test]
    async fn rejections_keep_their_reason() {
        let (mut a, mut b) = tokio::io::duplex(256);
        let reply = Reply::Rejected(RingError::DuplicateKey("data-abc".into()));
        send_msg(&mut a, &reply).await.unwrap();
        let got: Reply = recv_msg(&mut b).await.unwrap();
        assert_eq!(got, reply);
    }

    #[tokio::test]
    async fn oversized_length_is_refused() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_u32(MAX_FRAME as u32 + 1).await.unwrap();
        let err = recv_msg::<_, Request>(&mut b).await.unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge(n) if n == MAX_FRAME + 1));
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_u32(3).await.unwrap();
        a.write_all(&[0xc1, 0xc1, 0xc1]).await.unwrap();
        let err = recv_msg::<_, Request>(&mut b).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn truncated_frame_is_an_io_error() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_u32(10).await.unwrap();
        a.write_all(&[0x90]).await.unwrap();
        drop(a);
        let err = recv_msg::<_, Reply>(&mut b).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
