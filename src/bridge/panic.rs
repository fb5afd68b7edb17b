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

//! Log panics through a [`Router`] before the previous panic hook runs.

use std::panic;
use std::panic::PanicHookInfo;
use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

use crate::logger::Router;
use crate::record::Level;

fn payload_message(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Install a panic hook that logs every panic as a `CRITICAL` record, then delegates to the
/// hook that was installed before.
///
/// The panic hook is process-global; call this once, from the bootstrap code.
pub fn install(router: Arc<Router>) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let mut context = Map::new();
        if let Some(location) = info.location() {
            context.insert("file".to_string(), Value::from(location.file()));
            context.insert("line".to_string(), Value::from(location.line()));
        }
        if let Some(name) = std::thread::current().name() {
            context.insert("thread".to_string(), Value::from(name));
        }
        router.log_with(
            Level::Critical,
            format!("Panic: {}", payload_message(info)),
            context,
        );
        previous(info);
    }));
}
