// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::filter::CustomPredicate;
use crate::record::Record;

/// Messages of benign, transient database driver warnings.
pub const DEFAULT_NOISE: &[&str] = &[
    "MySQL server has gone away",
    "Lost connection to MySQL server",
];

/// An exclusion rule evaluated by a [`ChainFilter`](crate::filter::ChainFilter).
///
/// A predicate returns `true` to keep the record and `false` to exclude it from the chain.
#[derive(Debug)]
pub enum Predicate {
    /// Exclude records whose `context.exception` carries a 4xx HTTP status.
    ExcludeClientErrors,
    /// Exclude records whose message contains any of the substrings.
    ExcludeMessages(Vec<String>),
    /// A user-supplied rule.
    Custom(CustomPredicate),
}

impl Predicate {
    /// Exclude the [default noise](DEFAULT_NOISE) messages.
    pub fn exclude_default_noise() -> Self {
        Predicate::exclude_messages(DEFAULT_NOISE.iter().copied())
    }

    /// Exclude records whose message contains any of `needles`.
    pub fn exclude_messages<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::ExcludeMessages(needles.into_iter().map(Into::into).collect())
    }

    /// Return `true` if the record may pass.
    pub fn accept(&self, record: &Record) -> bool {
        match self {
            Predicate::ExcludeClientErrors => match record.exception_status() {
                Some(status) => status / 100 != 4,
                None => true,
            },
            Predicate::ExcludeMessages(needles) => {
                let message = record.message();
                !needles
                    .iter()
                    .any(|needle| !needle.is_empty() && message.contains(needle.as_str()))
            }
            Predicate::Custom(predicate) => predicate.accept(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::Exception;
    use crate::record::Level;

    fn with_status(status: u16) -> Record {
        Record::builder()
            .level(Level::Warning)
            .message("request failed")
            .exception(&Exception::http(status, "request failed"))
            .build()
    }

    #[test]
    fn client_errors_are_excluded() {
        let predicate = Predicate::ExcludeClientErrors;
        assert!(!predicate.accept(&with_status(404)));
        assert!(!predicate.accept(&with_status(400)));
        assert!(!predicate.accept(&with_status(499)));
        assert!(predicate.accept(&with_status(500)));
        assert!(predicate.accept(&with_status(302)));
    }

    #[test]
    fn records_without_status_pass() {
        let predicate = Predicate::ExcludeClientErrors;
        let plain = Record::builder().message("hello").build();
        let no_status = Record::builder()
            .message("boom")
            .exception(&Exception::new("Exception", "boom"))
            .build();
        assert!(predicate.accept(&plain));
        assert!(predicate.accept(&no_status));
    }

    #[test]
    fn noise_is_excluded_by_substring() {
        let predicate = Predicate::exclude_default_noise();
        let noisy = Record::builder()
            .message("User Warning: PDO::query(): MySQL server has gone away")
            .build();
        let other = Record::builder().message("do not ignore this").build();
        assert!(!predicate.accept(&noisy));
        assert!(predicate.accept(&other));
    }

    #[test]
    fn empty_needle_excludes_nothing() {
        let predicate = Predicate::exclude_messages([""]);
        assert!(predicate.accept(&Record::builder().message("anything").build()));
    }
}
