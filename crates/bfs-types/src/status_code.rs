/// Status code type alias.
#[allow(non_camel_case_types)]
pub type status_code_t = u16;

/// Common status codes (0-999).
pub mod StatusCode {
    use super::status_code_t;

    pub const OK: status_code_t = 0;
    pub const INVALID_ARG: status_code_t = 3;
    pub const IO_ERROR: status_code_t = 69;
    pub const FAULT_INJECTION: status_code_t = 70;
    pub const FOUND_BUG: status_code_t = 998;
}

/// RPC / outbound call status codes (2xxx).
pub mod RPCCode {
    use super::status_code_t;

    pub const TIMEOUT: status_code_t = 2005;
}

/// Metadata (file, needle and directory record) status codes (3xxx).
pub mod MetaCode {
    use super::status_code_t;

    pub const NOT_FOUND: status_code_t = 3000;
    pub const EXISTS: status_code_t = 3007;
    pub const INVALID_FILE_LAYOUT: status_code_t = 3013;
    pub const DIR_NOT_FOUND: status_code_t = 3020;
    pub const FILE_TOO_LARGE: status_code_t = 3102;
}

/// Directory orchestration status codes (5xxx).
pub mod DirectoryCode {
    use super::status_code_t;

    pub const STORE_NOT_AVAILABLE: status_code_t = 5000;
    pub const TOPOLOGY_INCONSISTENT: status_code_t = 5001;
    pub const ID_NOT_AVAILABLE: status_code_t = 5002;
}

/// Coordination service status codes (6xxx).
pub mod CoordCode {
    use super::status_code_t;

    pub const UNAVAILABLE: status_code_t = 6000;
    pub const NODE_NOT_FOUND: status_code_t = 6001;
    pub const BAD_DATA: status_code_t = 6002;
}

/// Key-value metadata store status codes (11xxx).
pub mod KvCode {
    use super::status_code_t;

    pub const UNAVAILABLE: status_code_t = 11000;
    pub const WRONG_TYPE: status_code_t = 11001;
    pub const BAD_VALUE: status_code_t = 11002;
}

/// The high-level category a status code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCodeType {
    Common,
    RPC,
    Meta,
    Directory,
    Coord,
    Kv,
    Invalid,
}

/// Determine the category of a status code by its numeric range.
pub fn type_of(code: status_code_t) -> StatusCodeType {
    match code {
        0..=999 => StatusCodeType::Common,
        2000..=2999 => StatusCodeType::RPC,
        3000..=3999 => StatusCodeType::Meta,
        5000..=5999 => StatusCodeType::Directory,
        6000..=6999 => StatusCodeType::Coord,
        11000..=11999 => StatusCodeType::Kv,
        _ => StatusCodeType::Invalid,
    }
}

/// The closed error taxonomy seen by directory callers.
///
/// Every status code maps onto exactly one kind. `OK` never travels as an
/// error and classifies as `Internal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidParam,
    TooLarge,
    StoreUnavailable,
    TopologyInconsistent,
    BackendUnavailable,
    IdUnavailable,
    Timeout,
    Internal,
}

/// Classify a status code into an [`ErrorKind`].
pub fn kind_of(code: status_code_t) -> ErrorKind {
    match code {
        MetaCode::NOT_FOUND | MetaCode::DIR_NOT_FOUND => ErrorKind::NotFound,
        MetaCode::EXISTS => ErrorKind::AlreadyExists,
        StatusCode::INVALID_ARG | MetaCode::INVALID_FILE_LAYOUT => ErrorKind::InvalidParam,
        MetaCode::FILE_TOO_LARGE => ErrorKind::TooLarge,
        DirectoryCode::STORE_NOT_AVAILABLE => ErrorKind::StoreUnavailable,
        DirectoryCode::TOPOLOGY_INCONSISTENT => ErrorKind::TopologyInconsistent,
        DirectoryCode::ID_NOT_AVAILABLE => ErrorKind::IdUnavailable,
        RPCCode::TIMEOUT => ErrorKind::Timeout,
        StatusCode::IO_ERROR | StatusCode::FAULT_INJECTION => ErrorKind::BackendUnavailable,
        c if matches!(type_of(c), StatusCodeType::Coord | StatusCodeType::Kv) => {
            ErrorKind::BackendUnavailable
        }
        _ => ErrorKind::Internal,
    }
}

/// Return a human-readable name for the given status code.
pub fn to_string(code: status_code_t) -> &'static str {
    match code {
        StatusCode::OK => "OK",
        StatusCode::INVALID_ARG => "InvalidArg",
        StatusCode::IO_ERROR => "IOError",
        StatusCode::FAULT_INJECTION => "FaultInjection",
        StatusCode::FOUND_BUG => "FoundBug",

        RPCCode::TIMEOUT => "RPC::Timeout",

        MetaCode::NOT_FOUND => "Meta::NotFound",
        MetaCode::EXISTS => "Meta::Exists",
        MetaCode::INVALID_FILE_LAYOUT => "Meta::InvalidFileLayout",
        MetaCode::DIR_NOT_FOUND => "Meta::DirNotFound",
        MetaCode::FILE_TOO_LARGE => "Meta::FileTooLarge",

        DirectoryCode::STORE_NOT_AVAILABLE => "Directory::StoreNotAvailable",
        DirectoryCode::TOPOLOGY_INCONSISTENT => "Directory::TopologyInconsistent",
        DirectoryCode::ID_NOT_AVAILABLE => "Directory::IdNotAvailable",

        CoordCode::UNAVAILABLE => "Coord::Unavailable",
        CoordCode::NODE_NOT_FOUND => "Coord::NodeNotFound",
        CoordCode::BAD_DATA => "Coord::BadData",

        KvCode::UNAVAILABLE => "Kv::Unavailable",
        KvCode::WRONG_TYPE => "Kv::WrongType",
        KvCode::BAD_VALUE => "Kv::BadValue",

        _ => "UnknownStatusCode",
    }
}
