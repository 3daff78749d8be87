//! Protocol-level error codes.
//!
//! The [`Display`](std::fmt::Display) output is `NAME: description`, which is what operators see inline next to a
//! directory or partition that failed.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_error_codes>

macro_rules! protocol_errors {
    ($($code:literal => $variant:ident, $name:literal, $desc:literal;)*) => {
        /// A non-zero error code carried inside an otherwise successful response.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[non_exhaustive]
        pub enum Error {
            $($variant,)*
            Unknown(i16),
        }

        impl Error {
            /// Map a wire error code to an error, `0` means "no error".
            pub fn new(code: i16) -> Option<Self> {
                match code {
                    0 => None,
                    $($code => Some(Self::$variant),)*
                    _ => Some(Self::Unknown(code)),
                }
            }

            pub fn code(&self) -> i16 {
                match self {
                    $(Self::$variant => $code,)*
                    Self::Unknown(code) => *code,
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                    Self::Unknown(_) => "UNKNOWN_ERROR_CODE",
                }
            }

            fn description(&self) -> Option<&'static str> {
                match self {
                    $(Self::$variant => Some($desc),)*
                    Self::Unknown(_) => None,
                }
            }
        }
    };
}

protocol_errors! {
    -1 => UnknownServerError, "UNKNOWN_SERVER_ERROR", "The server experienced an unexpected error when processing the request.";
    1 => OffsetOutOfRange, "OFFSET_OUT_OF_RANGE", "The requested offset is not within the range of offsets maintained by the server.";
    2 => CorruptMessage, "CORRUPT_MESSAGE", "This message has failed its CRC checksum, exceeds the valid size, has a null key for a compacted topic, or is otherwise corrupt.";
    3 => UnknownTopicOrPartition, "UNKNOWN_TOPIC_OR_PARTITION", "This server does not host this topic-partition.";
    4 => InvalidFetchSize, "INVALID_FETCH_SIZE", "The requested fetch size is invalid.";
    5 => LeaderNotAvailable, "LEADER_NOT_AVAILABLE", "There is no leader for this topic-partition as we are in the middle of a leadership election.";
    6 => NotLeaderOrFollower, "NOT_LEADER_OR_FOLLOWER", "For requests intended only for the leader, this error indicates that the broker is not the current leader. For requests intended for any replica, this error indicates that the broker is not a replica of the topic partition.";
    7 => RequestTimedOut, "REQUEST_TIMED_OUT", "The request timed out.";
    8 => BrokerNotAvailable, "BROKER_NOT_AVAILABLE", "The broker is not available.";
    9 => ReplicaNotAvailable, "REPLICA_NOT_AVAILABLE", "The replica is not available for the requested topic-partition.";
    10 => MessageTooLarge, "MESSAGE_TOO_LARGE", "The request included a message larger than the max message size the server will accept.";
    11 => StaleControllerEpoch, "STALE_CONTROLLER_EPOCH", "The controller moved to another broker.";
    12 => OffsetMetadataTooLarge, "OFFSET_METADATA_TOO_LARGE", "The metadata field of the offset request was too large.";
    13 => NetworkException, "NETWORK_EXCEPTION", "The server disconnected before a response was received.";
    14 => CoordinatorLoadInProgress, "COORDINATOR_LOAD_IN_PROGRESS", "The coordinator is loading and hence can't process requests.";
    15 => CoordinatorNotAvailable, "COORDINATOR_NOT_AVAILABLE", "The coordinator is not available.";
    16 => NotCoordinator, "NOT_COORDINATOR", "This is not the correct coordinator.";
    17 => InvalidTopicException, "INVALID_TOPIC_EXCEPTION", "The request attempted to perform an operation on an invalid topic.";
    18 => RecordListTooLarge, "RECORD_LIST_TOO_LARGE", "The request included message batch larger than the configured segment size on the server.";
    19 => NotEnoughReplicas, "NOT_ENOUGH_REPLICAS", "Messages are rejected since there are fewer in-sync replicas than required.";
    20 => NotEnoughReplicasAfterAppend, "NOT_ENOUGH_REPLICAS_AFTER_APPEND", "Messages are written to the log, but to fewer in-sync replicas than required.";
    21 => InvalidRequiredAcks, "INVALID_REQUIRED_ACKS", "Produce request specified an invalid value for required acks.";
    22 => IllegalGeneration, "ILLEGAL_GENERATION", "Specified group generation id is not valid.";
    23 => InconsistentGroupProtocol, "INCONSISTENT_GROUP_PROTOCOL", "The group member's supported protocols are incompatible with those of existing members.";
    24 => InvalidGroupId, "INVALID_GROUP_ID", "The configured groupId is invalid.";
    25 => UnknownMemberId, "UNKNOWN_MEMBER_ID", "The coordinator is not aware of this member.";
    26 => InvalidSessionTimeout, "INVALID_SESSION_TIMEOUT", "The session timeout is not within the range allowed by the broker.";
    27 => RebalanceInProgress, "REBALANCE_IN_PROGRESS", "The group is rebalancing, so a rejoin is needed.";
    28 => InvalidCommitOffsetSize, "INVALID_COMMIT_OFFSET_SIZE", "The committing offset data size is not valid.";
    29 => TopicAuthorizationFailed, "TOPIC_AUTHORIZATION_FAILED", "Topic authorization failed.";
    30 => GroupAuthorizationFailed, "GROUP_AUTHORIZATION_FAILED", "Group authorization failed.";
    31 => ClusterAuthorizationFailed, "CLUSTER_AUTHORIZATION_FAILED", "Cluster authorization failed.";
    32 => InvalidTimestamp, "INVALID_TIMESTAMP", "The timestamp of the message is out of acceptable range.";
    33 => UnsupportedSaslMechanism, "UNSUPPORTED_SASL_MECHANISM", "The broker does not support the requested SASL mechanism.";
    34 => IllegalSaslState, "ILLEGAL_SASL_STATE", "Request is not valid given the current SASL state.";
    35 => UnsupportedVersion, "UNSUPPORTED_VERSION", "The version of API is not supported.";
    36 => TopicAlreadyExists, "TOPIC_ALREADY_EXISTS", "Topic with this name already exists.";
    37 => InvalidPartitions, "INVALID_PARTITIONS", "Number of partitions is below 1.";
    38 => InvalidReplicationFactor, "INVALID_REPLICATION_FACTOR", "Replication factor is below 1 or larger than the number of available brokers.";
    39 => InvalidReplicaAssignment, "INVALID_REPLICA_ASSIGNMENT", "Replica assignment is invalid.";
    40 => InvalidConfig, "INVALID_CONFIG", "Configuration is invalid.";
    41 => NotController, "NOT_CONTROLLER", "This is not the correct controller for this cluster.";
    42 => InvalidRequest, "INVALID_REQUEST", "This most likely occurs because of a request being malformed by the client library or the message was sent to an incompatible broker.";
    43 => UnsupportedForMessageFormat, "UNSUPPORTED_FOR_MESSAGE_FORMAT", "The message format version on the broker does not support the request.";
    44 => PolicyViolation, "POLICY_VIOLATION", "Request parameters do not satisfy the configured policy.";
    45 => OutOfOrderSequenceNumber, "OUT_OF_ORDER_SEQUENCE_NUMBER", "The broker received an out of order sequence number.";
    46 => DuplicateSequenceNumber, "DUPLICATE_SEQUENCE_NUMBER", "The broker received a duplicate sequence number.";
    47 => InvalidProducerEpoch, "INVALID_PRODUCER_EPOCH", "Producer attempted to produce with an old epoch.";
    48 => InvalidTxnState, "INVALID_TXN_STATE", "The producer attempted a transactional operation in an invalid state.";
    49 => InvalidProducerIdMapping, "INVALID_PRODUCER_ID_MAPPING", "The producer attempted to use a producer id which is not currently assigned to its transactional id.";
    50 => InvalidTransactionTimeout, "INVALID_TRANSACTION_TIMEOUT", "The transaction timeout is larger than the maximum value allowed by the broker.";
    51 => ConcurrentTransactions, "CONCURRENT_TRANSACTIONS", "The producer attempted to update a transaction while another concurrent operation on the same transaction was ongoing.";
    52 => TransactionCoordinatorFenced, "TRANSACTION_COORDINATOR_FENCED", "Indicates that the transaction coordinator sending a WriteTxnMarker is no longer the current coordinator for a given producer.";
    53 => TransactionalIdAuthorizationFailed, "TRANSACTIONAL_ID_AUTHORIZATION_FAILED", "Transactional Id authorization failed.";
    54 => SecurityDisabled, "SECURITY_DISABLED", "Security features are disabled.";
    55 => OperationNotAttempted, "OPERATION_NOT_ATTEMPTED", "The broker did not attempt to execute this operation.";
    56 => KafkaStorageError, "KAFKA_STORAGE_ERROR", "Disk error when trying to access log file on the disk.";
    57 => LogDirNotFound, "LOG_DIR_NOT_FOUND", "The user-specified log directory is not found in the broker config.";
    58 => SaslAuthenticationFailed, "SASL_AUTHENTICATION_FAILED", "SASL Authentication failed.";
    59 => UnknownProducerId, "UNKNOWN_PRODUCER_ID", "This exception is raised by the broker if it could not locate the producer metadata associated with the producerId in question.";
    60 => ReassignmentInProgress, "REASSIGNMENT_IN_PROGRESS", "A partition reassignment is in progress.";
    61 => DelegationTokenAuthDisabled, "DELEGATION_TOKEN_AUTH_DISABLED", "Delegation Token feature is not enabled.";
    62 => DelegationTokenNotFound, "DELEGATION_TOKEN_NOT_FOUND", "Delegation Token is not found on server.";
    63 => DelegationTokenOwnerMismatch, "DELEGATION_TOKEN_OWNER_MISMATCH", "Specified Principal is not valid Owner/Renewer.";
    64 => DelegationTokenRequestNotAllowed, "DELEGATION_TOKEN_REQUEST_NOT_ALLOWED", "Delegation Token requests are not allowed on PLAINTEXT/1-way SSL channels and on delegation token authenticated channels.";
    65 => DelegationTokenAuthorizationFailed, "DELEGATION_TOKEN_AUTHORIZATION_FAILED", "Delegation Token authorization failed.";
    66 => DelegationTokenExpired, "DELEGATION_TOKEN_EXPIRED", "Delegation Token is expired.";
    67 => InvalidPrincipalType, "INVALID_PRINCIPAL_TYPE", "Supplied principalType is not supported.";
    68 => NonEmptyGroup, "NON_EMPTY_GROUP", "The group is not empty.";
    69 => GroupIdNotFound, "GROUP_ID_NOT_FOUND", "The group id does not exist.";
    70 => FetchSessionIdNotFound, "FETCH_SESSION_ID_NOT_FOUND", "The fetch session ID was not found.";
    71 => InvalidFetchSessionEpoch, "INVALID_FETCH_SESSION_EPOCH", "The fetch session epoch is invalid.";
    72 => ListenerNotFound, "LISTENER_NOT_FOUND", "There is no listener on the leader broker that matches the listener on which metadata request was processed.";
    73 => TopicDeletionDisabled, "TOPIC_DELETION_DISABLED", "Topic deletion is disabled.";
    74 => FencedLeaderEpoch, "FENCED_LEADER_EPOCH", "The leader epoch in the request is older than the epoch on the broker.";
    75 => UnknownLeaderEpoch, "UNKNOWN_LEADER_EPOCH", "The leader epoch in the request is newer than the epoch on the broker.";
    76 => UnsupportedCompressionType, "UNSUPPORTED_COMPRESSION_TYPE", "The requesting client does not support the compression type of given partition.";
    77 => StaleBrokerEpoch, "STALE_BROKER_EPOCH", "Broker epoch has changed.";
    78 => OffsetNotAvailable, "OFFSET_NOT_AVAILABLE", "The leader high watermark has not caught up from a recent leader election so the offsets cannot be guaranteed to be monotonically increasing.";
    79 => MemberIdRequired, "MEMBER_ID_REQUIRED", "The group member needs to have a valid member id before actually entering a consumer group.";
    80 => PreferredLeaderNotAvailable, "PREFERRED_LEADER_NOT_AVAILABLE", "The preferred leader was not available.";
    81 => GroupMaxSizeReached, "GROUP_MAX_SIZE_REACHED", "The consumer group has reached its max size.";
    82 => FencedInstanceId, "FENCED_INSTANCE_ID", "The broker rejected this static consumer since another consumer with the same group.instance.id has registered with a different member.id.";
    83 => EligibleLeadersNotAvailable, "ELIGIBLE_LEADERS_NOT_AVAILABLE", "Eligible topic partition leaders are not available.";
    84 => ElectionNotNeeded, "ELECTION_NOT_NEEDED", "Leader election not needed for topic partition.";
    85 => NoReassignmentInProgress, "NO_REASSIGNMENT_IN_PROGRESS", "No partition reassignment is in progress.";
    86 => GroupSubscribedToTopic, "GROUP_SUBSCRIBED_TO_TOPIC", "Deleting offsets of a topic is forbidden while the consumer group is actively subscribed to it.";
    87 => InvalidRecord, "INVALID_RECORD", "This record has failed the validation on broker and hence will be rejected.";
    88 => UnstableOffsetCommit, "UNSTABLE_OFFSET_COMMIT", "There are unstable offsets that need to be cleared.";
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.description() {
            Some(description) => write!(f, "{}: {}", self.name(), description),
            None => write!(f, "{}: unknown error code {}", self.name(), self.code()),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn zero_is_no_error() {
        assert_eq!(Error::new(0), None);
    }

    #[test]
    fn display() {
        assert_eq!(
            Error::KafkaStorageError.to_string(),
            "KAFKA_STORAGE_ERROR: Disk error when trying to access log file on the disk."
        );
        assert_eq!(
            Error::new(-1).unwrap().to_string(),
            "UNKNOWN_SERVER_ERROR: The server experienced an unexpected error when processing the request."
        );
        assert_eq!(
            Error::new(9999).unwrap().to_string(),
            "UNKNOWN_ERROR_CODE: unknown error code 9999"
        );
    }

    proptest! {
        #[test]
        fn code_roundtrip(code: i16) {
            match Error::new(code) {
                None => assert_eq!(code, 0),
                Some(err) => assert_eq!(err.code(), code),
            }
        }
    }
}
