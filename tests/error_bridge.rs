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

use std::io;

use logservice::Level;
use logservice::append::Capture;
use logservice::bridge::runtime::RuntimeFault;
use logservice::bridge::runtime::Signal;
use logservice::bridge::runtime::SignalKind;
use logservice::config::Config;
use logservice::handler::Origin;
use logservice::handler::Presentation;
use logservice::service::LogService;

fn service() -> (LogService, Capture, Capture) {
    let stdout = Capture::default();
    let stderr = Capture::default();
    let service = LogService::builder(Config::default())
        .stdout(stdout.clone())
        .stderr(stderr.clone())
        .build()
        .unwrap();
    (service, stdout, stderr)
}

#[test]
fn non_fatal_signals_are_logged_and_execution_continues() {
    let (service, stdout, stderr) = service();
    let bridge = service.bridge();

    bridge
        .handle(Signal::new(SignalKind::UserNotice, "cache is cold").at("src/cache.rs", 10))
        .unwrap();
    bridge.trigger(SignalKind::Deprecated, "use v2").unwrap();

    let info = stdout.records();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].level(), Level::Info);
    assert_eq!(info[0].message(), "User Notice: cache is cold");
    assert_eq!(info[0].context()["file"], "src/cache.rs");
    assert_eq!(info[0].context()["line"], 10);

    let warnings = stderr.records();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level(), Level::Warning);
    assert_eq!(warnings[0].message(), "Deprecated: use v2");
}

#[test]
fn command_completes_after_a_deprecation_notice() {
    let (service, stdout, stderr) = service();
    let bridge = service.bridge();
    let mut handler = service.exception_handler(Presentation::Fallback(Box::new(io::sink())));

    let result = handler.run(Origin::Command, || {
        bridge.trigger(SignalKind::UserDeprecated, "--legacy is deprecated")?;
        Ok::<_, RuntimeFault>(6 * 7)
    });

    assert_eq!(result.unwrap(), 42);
    assert!(stdout.is_empty());
    assert_eq!(stderr.len(), 1);
    assert_eq!(stderr.records()[0].level(), Level::Warning);
}

#[test]
fn fatal_signal_is_logged_once_at_the_boundary() {
    let (service, _, stderr) = service();
    let bridge = service.bridge();
    let mut handler = service.exception_handler(Presentation::Fallback(Box::new(io::sink())));

    let mut reached_end = false;
    let result = handler.run(Origin::Application, || {
        bridge.trigger(SignalKind::Warning, "disk almost full")?;
        bridge.trigger(SignalKind::UserError, "invalid state")?;
        reached_end = true;
        Ok::<_, RuntimeFault>(())
    });

    assert!(result.is_err());
    assert!(!reached_end);

    let records = stderr.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].message(), "Warning: disk almost full");

    let errors: Vec<_> = records
        .iter()
        .filter(|r| r.level() >= Level::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].level(), Level::Error);
    assert_eq!(
        errors[0].message(),
        r#"Uncaught Exception User Error: "invalid state""#
    );
    assert_eq!(errors[0].exception().unwrap()["class"], "User Error");
}

#[test]
fn unknown_kind_is_fatal() {
    let (service, stdout, stderr) = service();
    let fault = service
        .bridge()
        .trigger(SignalKind::Unknown, "mystery")
        .unwrap_err();

    assert_eq!(fault.to_string(), "Unknown Error: mystery");
    assert!(stdout.is_empty());
    assert!(stderr.is_empty());
}
