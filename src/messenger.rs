//! A single broker connection with request/response multiplexing.

use std::{
    collections::HashMap,
    io::Cursor,
    ops::DerefMut,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncWrite, WriteHalf},
    sync::{oneshot, Mutex as AsyncMutex},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    build_info::{SOFTWARE_NAME, SOFTWARE_VERSION},
    protocol::{
        api_key::ApiKey,
        api_version::{ApiVersion, ApiVersionRange},
        frame::{AsyncMessageRead, AsyncMessageWrite},
        messages::{
            ApiVersionsRequest, ReadVersionedError, ReadVersionedType, RequestBody, RequestHeader,
            ResponseHeader, WriteVersionedError, WriteVersionedType,
        },
        primitives::TaggedFields,
    },
};

#[derive(Debug)]
struct Response {
    #[allow(dead_code)]
    header: ResponseHeader,
    data: Cursor<Vec<u8>>,
}

#[derive(Debug)]
struct ActiveRequest {
    channel: oneshot::Sender<Result<Response, RequestError>>,
    use_tagged_fields_in_response: bool,
}

#[derive(Debug)]
enum MessengerState {
    /// Currently active requests by correlation ID.
    RequestMap(HashMap<i32, ActiveRequest>),

    /// One or our streams died and we are unable to process any more requests.
    Poison(Arc<RequestError>),
}

impl MessengerState {
    fn poison(&mut self, err: RequestError) -> Arc<RequestError> {
        match self {
            Self::RequestMap(map) => {
                let err = Arc::new(err);

                // inform all active requests
                for (_correlation_id, active_request) in map.drain() {
                    // it's OK if the other side is gone
                    active_request
                        .channel
                        .send(Err(RequestError::Poisoned(Arc::clone(&err))))
                        .ok();
                }

                *self = Self::Poison(Arc::clone(&err));
                err
            }
            Self::Poison(e) => {
                // already poisoned, keep the first error
                Arc::clone(e)
            }
        }
    }
}

/// A connection to a single broker.
///
/// Responses are read by a background task and handed to the request that waits for the matching correlation ID,
/// so multiple requests can be in flight at the same time.
#[derive(Debug)]
pub struct Messenger<RW> {
    /// The half of the stream that we use to send data TO the broker.
    ///
    /// This will be used by [`request`](Self::request) to queue up messages.
    stream_write: Arc<AsyncMutex<WriteHalf<RW>>>,

    /// Client ID sent with every request header.
    client_id: Arc<str>,

    /// The next correlation ID.
    correlation_id: AtomicI32,

    /// Version ranges that we think are supported by the broker.
    ///
    /// This needs to be bootstrapped by [`sync_versions`](Self::sync_versions).
    version_ranges: RwLock<HashMap<ApiKey, ApiVersionRange>>,

    /// Current stream state.
    state: Arc<Mutex<MessengerState>>,

    /// Join handle for the background worker that fetches responses.
    join_handle: JoinHandle<()>,
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RequestError {
    #[error("Cannot find matching version for: {api_key:?}")]
    NoVersionMatch { api_key: ApiKey },

    #[error("Cannot write data: {0}")]
    WriteError(#[from] WriteVersionedError),

    #[error("Cannot write framed message: {0}")]
    WriteMessageError(#[from] crate::protocol::frame::WriteError),

    #[error("Cannot read data: {0}")]
    ReadError(#[from] crate::protocol::traits::ReadError),

    #[error("Cannot read versioned data: {0}")]
    ReadVersionedError(#[from] ReadVersionedError),

    #[error("Cannot read framed message: {0}")]
    ReadFramedMessageError(#[from] crate::protocol::frame::ReadError),

    #[error(
        "Data left at the end of the message. Got {message_size} bytes but only read {read} bytes. \
         api_key={api_key:?} api_version={api_version}"
    )]
    TooMuchData {
        message_size: u64,
        read: u64,
        api_key: ApiKey,
        api_version: ApiVersion,
    },

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Connection is poisoned: {0}")]
    Poisoned(Arc<RequestError>),
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SyncVersionsError {
    #[error("Did not find a version for ApiVersion that works with that broker")]
    NoWorkingVersion,

    #[error("Request error: {0}")]
    RequestError(#[from] RequestError),

    #[error("Got flipped version from server for API key {api_key:?}: min={min} max={max}")]
    FlippedVersionRange {
        api_key: ApiKey,
        min: ApiVersion,
        max: ApiVersion,
    },
}

impl<RW> Messenger<RW>
where
    RW: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(stream: RW, max_message_size: usize, client_id: Arc<str>) -> Self {
        let (stream_read, stream_write) = tokio::io::split(stream);
        let state = Arc::new(Mutex::new(MessengerState::RequestMap(HashMap::default())));
        let state_captured = Arc::clone(&state);

        let join_handle = tokio::spawn(async move {
            let mut stream_read = stream_read;

            loop {
                match stream_read.read_message(max_message_size).await {
                    Ok(msg) => {
                        // message was read, so all subsequent errors should not poison the whole stream
                        let mut cursor = Cursor::new(msg);

                        // read the correlation ID first, the rest of the header depends on the request
                        let correlation_id =
                            match ResponseHeader::read_versioned(&mut cursor, ApiVersion(0)) {
                                Ok(header) => header.correlation_id,
                                Err(e) => {
                                    warn!(%e, "Cannot read message header, ignoring message");
                                    continue;
                                }
                            };

                        let active_request = {
                            let mut state = state_captured.lock();
                            match state.deref_mut() {
                                MessengerState::RequestMap(map) => map.remove(&correlation_id),
                                MessengerState::Poison(_) => None,
                            }
                        };

                        let Some(active_request) = active_request else {
                            warn!(
                                correlation_id,
                                "Got response for unknown request",
                            );
                            continue;
                        };

                        // rewind and read the header again, this time with the right version
                        cursor.set_position(0);
                        let header = match ResponseHeader::read_versioned(
                            &mut cursor,
                            ResponseHeader::version(active_request.use_tagged_fields_in_response),
                        ) {
                            Ok(header) => header,
                            Err(e) => {
                                // it's OK if the other side is gone
                                active_request.channel.send(Err(e.into())).ok();
                                continue;
                            }
                        };

                        // it's OK if the other side is gone
                        active_request
                            .channel
                            .send(Ok(Response {
                                header,
                                data: cursor,
                            }))
                            .ok();
                    }
                    Err(e) => {
                        state_captured.lock().poison(e.into());
                        return;
                    }
                }
            }
        });

        Self {
            stream_write: Arc::new(AsyncMutex::new(stream_write)),
            client_id,
            correlation_id: AtomicI32::new(0),
            version_ranges: RwLock::new(HashMap::new()),
            state,
            join_handle,
        }
    }

    #[cfg(test)]
    fn set_version_ranges(&self, ranges: HashMap<ApiKey, ApiVersionRange>) {
        *self.version_ranges.write() = ranges;
    }

    /// Sends `msg` with the highest version that both sides support and waits for the response.
    pub async fn request<R>(&self, msg: R) -> Result<R::ResponseBody, RequestError>
    where
        R: RequestBody + Send + WriteVersionedType<Vec<u8>>,
        R::ResponseBody: ReadVersionedType<Cursor<Vec<u8>>>,
    {
        let body_api_version = self
            .version_ranges
            .read()
            .get(&R::API_KEY)
            .and_then(|range_server| range_server.highest_common(&R::API_VERSION_RANGE))
            .ok_or(RequestError::NoVersionMatch {
                api_key: R::API_KEY,
            })?;

        self.request_with_version(msg, body_api_version).await
    }

    async fn request_with_version<R>(
        &self,
        msg: R,
        body_api_version: ApiVersion,
    ) -> Result<R::ResponseBody, RequestError>
    where
        R: RequestBody + Send + WriteVersionedType<Vec<u8>>,
        R::ResponseBody: ReadVersionedType<Cursor<Vec<u8>>>,
    {
        let use_tagged_fields_in_request =
            body_api_version >= R::FIRST_TAGGED_FIELD_IN_REQUEST_VERSION;
        let use_tagged_fields_in_response =
            body_api_version >= R::FIRST_TAGGED_FIELD_IN_RESPONSE_VERSION;

        // Correlation IDs only need to be unique per connection, wrapping around is fine.
        let correlation_id = self.correlation_id.fetch_add(1, Ordering::SeqCst);

        let header = RequestHeader {
            request_api_key: R::API_KEY,
            request_api_version: body_api_version,
            correlation_id,
            client_id: Some(String::from(self.client_id.as_ref())),
            tagged_fields: Some(TaggedFields::default()),
        };
        let header_version = RequestHeader::version(use_tagged_fields_in_request);

        let mut buf = Vec::new();
        header.write_versioned(&mut buf, header_version)?;
        msg.write_versioned(&mut buf, body_api_version)?;

        let (tx, rx) = oneshot::channel();

        // register before sending, the response might arrive before `send_message` returns
        {
            let mut state = self.state.lock();
            match state.deref_mut() {
                MessengerState::RequestMap(map) => {
                    map.insert(
                        correlation_id,
                        ActiveRequest {
                            channel: tx,
                            use_tagged_fields_in_response,
                        },
                    );
                }
                MessengerState::Poison(e) => {
                    return Err(RequestError::Poisoned(Arc::clone(e)));
                }
            }
        }

        debug!(
            api_key = ?R::API_KEY,
            api_version = %body_api_version,
            correlation_id,
            "Sending request",
        );

        if let Err(e) = self.send_message(buf).await {
            let mut state = self.state.lock();
            if let MessengerState::RequestMap(map) = state.deref_mut() {
                map.remove(&correlation_id);
            }
            return Err(e);
        }

        let mut response = rx.await.map_err(|_| RequestError::ConnectionClosed)??;

        let body = R::ResponseBody::read_versioned(&mut response.data, body_api_version)?;

        // check if we fully consumed the message, otherwise there might be a bug in our protocol code
        let read_bytes = response.data.position();
        let message_bytes = response.data.into_inner().len() as u64;
        if read_bytes != message_bytes {
            return Err(RequestError::TooMuchData {
                message_size: message_bytes,
                read: read_bytes,
                api_key: R::API_KEY,
                api_version: body_api_version,
            });
        }

        Ok(body)
    }

    async fn send_message(&self, msg: Vec<u8>) -> Result<(), RequestError> {
        let mut stream_write = self.stream_write.lock().await;
        match stream_write.write_message(&msg).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // a partial write leaves the stream in an undefined state
                let e = self.state.lock().poison(e.into());
                Err(RequestError::Poisoned(e))
            }
        }
    }

    /// Negotiates the supported API versions with the broker.
    ///
    /// Starts with the highest `ApiVersions` version we know and walks down until the broker answers.
    pub async fn sync_versions(&self) -> Result<(), SyncVersionsError> {
        let range = ApiVersionsRequest::API_VERSION_RANGE;

        for upper_bound in (range.min().0..=range.max().0).rev() {
            let version = ApiVersion(upper_bound);
            let body = ApiVersionsRequest {
                client_software_name: Some(SOFTWARE_NAME.to_string()),
                client_software_version: Some(SOFTWARE_VERSION.to_string()),
                tagged_fields: Some(TaggedFields::default()),
            };

            match self.request_with_version(&body, version).await {
                Ok(response) => {
                    if let Some(e) = response.error_code {
                        debug!(
                            %e,
                            %version,
                            "Got error during version sync, cannot use version for ApiVersionRequest",
                        );
                        continue;
                    }

                    let mut ranges = HashMap::with_capacity(response.api_keys.len());
                    for api_key in response.api_keys {
                        let range = api_key.range().ok_or(SyncVersionsError::FlippedVersionRange {
                            api_key: api_key.api_key,
                            min: api_key.min_version,
                            max: api_key.max_version,
                        })?;
                        ranges.insert(api_key.api_key, range);
                    }

                    debug!(
                        %version,
                        versions = ?ranges,
                        "Detected supported broker versions",
                    );
                    *self.version_ranges.write() = ranges;

                    return Ok(());
                }
                Err(RequestError::ReadVersionedError(e)) => {
                    // the broker might answer with a lower version than we asked for
                    debug!(
                        %e,
                        %version,
                        "Cannot read ApiVersionResponse for version",
                    );
                    continue;
                }
                Err(RequestError::TooMuchData {
                    message_size,
                    read,
                    ..
                }) => {
                    debug!(
                        %version,
                        message_size,
                        read,
                        "Cannot read ApiVersionResponse, too much data",
                    );
                    continue;
                }
                Err(e) => {
                    return Err(SyncVersionsError::RequestError(e));
                }
            }
        }

        Err(SyncVersionsError::NoWorkingVersion)
    }
}

impl<RW> Drop for Messenger<RW> {
    fn drop(&mut self) {
        self.join_handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use tokio::io::{duplex, DuplexStream};

    use super::*;
    use crate::protocol::{
        error::Error as ApiError,
        messages::{
            ApiVersionsResponse, ApiVersionsResponseApiKey, DescribeLogDirsRequest,
            DescribeLogDirsResponse,
        },
    };

    const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

    fn messenger() -> (Messenger<DuplexStream>, DuplexStream) {
        let (client, server) = duplex(64 * 1024);
        (
            Messenger::new(client, MAX_MESSAGE_SIZE, Arc::from("test")),
            server,
        )
    }

    /// Reads one request from `server`, returns its header.
    async fn read_request(server: &mut DuplexStream, header_version: i16) -> RequestHeader {
        let msg = server.read_message(MAX_MESSAGE_SIZE).await.unwrap();
        RequestHeader::read_versioned(&mut Cursor::new(msg), ApiVersion(header_version)).unwrap()
    }

    async fn write_response<T>(
        server: &mut DuplexStream,
        correlation_id: i32,
        header_version: i16,
        body: T,
        body_version: i16,
    ) where
        T: WriteVersionedType<Vec<u8>>,
    {
        let mut buf = Vec::new();
        ResponseHeader {
            correlation_id,
            tagged_fields: None,
        }
        .write_versioned(&mut buf, ApiVersion(header_version))
        .unwrap();
        body.write_versioned(&mut buf, ApiVersion(body_version))
            .unwrap();
        server.write_message(&buf).await.unwrap();
    }

    fn api_versions_response(
        error_code: Option<ApiError>,
        keys: &[(ApiKey, i16, i16)],
    ) -> ApiVersionsResponse {
        ApiVersionsResponse {
            error_code,
            api_keys: keys
                .iter()
                .map(|(api_key, min, max)| ApiVersionsResponseApiKey {
                    api_key: *api_key,
                    min_version: ApiVersion(*min),
                    max_version: ApiVersion(*max),
                    tagged_fields: None,
                })
                .collect(),
            throttle_time_ms: None,
            tagged_fields: None,
        }
    }

    #[tokio::test]
    async fn sync_versions_falls_back() {
        let (messenger, mut server) = messenger();

        let server = tokio::spawn(async move {
            // v3 is rejected the way old brokers do it
            let header = read_request(&mut server, 2).await;
            assert_eq!(header.request_api_version, ApiVersion(3));
            write_response(
                &mut server,
                header.correlation_id,
                0,
                api_versions_response(Some(ApiError::UnsupportedVersion), &[]),
                0,
            )
            .await;

            let header = read_request(&mut server, 1).await;
            assert_eq!(header.request_api_version, ApiVersion(2));
            assert_eq!(header.client_id.as_deref(), Some("test"));
            write_response(
                &mut server,
                header.correlation_id,
                0,
                api_versions_response(None, &[(ApiKey::DescribeLogDirs, 0, 1)]),
                2,
            )
            .await;

            server
        });

        messenger.sync_versions().await.unwrap();
        let _server = server.await.unwrap();

        assert_eq!(
            messenger
                .version_ranges
                .read()
                .get(&ApiKey::DescribeLogDirs)
                .copied(),
            Some(ApiVersionRange::new(0, 1))
        );
    }

    #[tokio::test]
    async fn sync_versions_rejects_flipped_range() {
        let (messenger, mut server) = messenger();

        let server = tokio::spawn(async move {
            let header = read_request(&mut server, 2).await;
            write_response(
                &mut server,
                header.correlation_id,
                0,
                api_versions_response(None, &[(ApiKey::Metadata, 4, 1)]),
                3,
            )
            .await;
            server
        });

        let err = messenger.sync_versions().await.unwrap_err();
        assert_matches!(
            err,
            SyncVersionsError::FlippedVersionRange {
                api_key: ApiKey::Metadata,
                ..
            }
        );
        let _server = server.await.unwrap();
    }

    #[tokio::test]
    async fn request_without_version_match() {
        let (messenger, _server) = messenger();
        messenger.set_version_ranges(HashMap::from([(
            ApiKey::DescribeLogDirs,
            ApiVersionRange::new(5, 7),
        )]));

        let err = messenger
            .request(DescribeLogDirsRequest {
                topics: None,
                tagged_fields: None,
            })
            .await
            .unwrap_err();
        assert_matches!(
            err,
            RequestError::NoVersionMatch {
                api_key: ApiKey::DescribeLogDirs
            }
        );
    }

    #[tokio::test]
    async fn request_uses_flexible_headers() {
        let (messenger, mut server) = messenger();
        messenger.set_version_ranges(HashMap::from([(
            ApiKey::DescribeLogDirs,
            ApiVersionRange::new(0, 9),
        )]));

        let server = tokio::spawn(async move {
            let header = read_request(&mut server, 2).await;
            assert_eq!(header.request_api_key, ApiKey::DescribeLogDirs);
            assert_eq!(header.request_api_version, ApiVersion(4));
            write_response(
                &mut server,
                header.correlation_id,
                1,
                DescribeLogDirsResponse {
                    throttle_time_ms: 0,
                    error: None,
                    results: vec![],
                    tagged_fields: None,
                },
                4,
            )
            .await;
            server
        });

        let response = messenger
            .request(DescribeLogDirsRequest {
                topics: None,
                tagged_fields: None,
            })
            .await
            .unwrap();
        assert!(response.results.is_empty());
        let _server = server.await.unwrap();
    }

    #[tokio::test]
    async fn closed_connection_poisons() {
        let (messenger, server) = messenger();
        messenger.set_version_ranges(HashMap::from([(
            ApiKey::DescribeLogDirs,
            ApiVersionRange::new(0, 4),
        )]));
        drop(server);

        // give the reader task a chance to notice
        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = messenger
            .request(DescribeLogDirsRequest {
                topics: None,
                tagged_fields: None,
            })
            .await
            .unwrap_err();
        assert_matches!(err, RequestError::Poisoned(_));
    }
}
