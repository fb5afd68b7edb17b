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

use logservice::bridge::runtime::RuntimeFault;
use logservice::bridge::runtime::SignalKind;
use logservice::config::Config;
use logservice::handler::Origin;
use logservice::handler::Presentation;
use logservice::service::LogService;

fn main() {
    let service = LogService::builder(Config::default()).build().unwrap();
    service.install_log_bridge().unwrap();

    let bridge = service.bridge();
    let mut handler = service.exception_handler(Presentation::console());

    let result = handler.run(Origin::Command, || {
        log::info!("importing customers");
        bridge.trigger(SignalKind::Deprecated, "the --legacy flag is deprecated")?;
        bridge.trigger(SignalKind::UserError, "customer file is empty")?;
        Ok::<_, RuntimeFault>(())
    });

    if let Err(handled) = result {
        std::process::exit(handled.exit_code());
    }
}
