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

use logservice::Level;
use logservice::append::Capture;
use logservice::config::Config;
use logservice::service::LogService;

#[test]
fn panics_are_logged_as_critical() {
    let stderr = Capture::default();
    let service = LogService::builder(Config::default())
        .stdout(Capture::default())
        .stderr(stderr.clone())
        .build()
        .unwrap();
    service.install_panic_hook();

    let result = std::thread::Builder::new()
        .name("worker".to_string())
        .spawn(|| panic!("index out of range"))
        .unwrap()
        .join();
    assert!(result.is_err());

    let records = stderr.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level(), Level::Critical);
    assert_eq!(records[0].message(), "Panic: index out of range");
    assert_eq!(records[0].context()["thread"], "worker");
    assert!(records[0].context()["file"].as_str().unwrap().ends_with("panic_hook.rs"));
}
