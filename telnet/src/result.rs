//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

/// Result type for Telnet engine operations.
pub type TelnetResult<T> = Result<T, TelnetError>;

/// Protocol framing problems detected while parsing suboptions.
///
/// These are never fatal to a connection: the negotiator logs them and
/// drops or skips the offending bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetError {
    /// A suboption frame was shorter than the minimum `code IAC SE`.
    TruncatedSuboption {
        /// Bytes that were available.
        available: usize,
    },
    /// No SE byte terminates the suboption within the buffered data.
    UnterminatedSuboption,
    /// The SE byte found was not preceded by IAC.
    BadSuboptionTerminator,
}

impl std::error::Error for TelnetError {}

impl std::fmt::Display for TelnetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetError::TruncatedSuboption { available } => {
                write!(f, "suboption frame truncated ({available} bytes available)")
            }
            TelnetError::UnterminatedSuboption => {
                write!(f, "suboption frame has no IAC SE terminator")
            }
            TelnetError::BadSuboptionTerminator => {
                write!(f, "suboption SE byte is not preceded by IAC")
            }
        }
    }
}
