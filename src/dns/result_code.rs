//! Response codes carried in the low four bits of the header flags

/// The result code for a DNS query, as defined by RFC 1035
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ResultCode {
    #[default]
    NoError = 0,
    FormatError = 1,
    ServerFailure = 2,
    NameError = 3,
    NotImplemented = 4,
    Refused = 5,
}

impl ResultCode {
    pub fn from_num(num: u8) -> Option<ResultCode> {
        match num {
            0 => Some(ResultCode::NoError),
            1 => Some(ResultCode::FormatError),
            2 => Some(ResultCode::ServerFailure),
            3 => Some(ResultCode::NameError),
            4 => Some(ResultCode::NotImplemented),
            5 => Some(ResultCode::Refused),
            _ => None,
        }
    }

    pub fn to_num(self) -> u8 {
        self as u8
    }
}
