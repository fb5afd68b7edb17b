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

use std::fmt::Debug;

use crate::filter::Predicate;
use crate::record::Record;

/// A predicate that you can pass the custom function.
///
/// The custom function accepts [`&Record`][Record] and returns `true` to keep the record. For
/// example:
///
/// ```rust
/// use logservice::filter::CustomPredicate;
/// use logservice::record::Record;
///
/// let predicate = CustomPredicate::new(|record: &Record| record.channel() != "doctrine");
/// ```
pub struct CustomPredicate {
    f: Box<dyn Fn(&Record) -> bool + Send + Sync + 'static>,
}

impl Debug for CustomPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CustomPredicate {{ ... }}")
    }
}

impl CustomPredicate {
    pub fn new(predicate: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        CustomPredicate {
            f: Box::new(predicate),
        }
    }

    pub(crate) fn accept(&self, record: &Record) -> bool {
        (self.f)(record)
    }
}

impl From<CustomPredicate> for Predicate {
    fn from(predicate: CustomPredicate) -> Self {
        Predicate::Custom(predicate)
    }
}
