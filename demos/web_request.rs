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

use logservice::Exception;
use logservice::config::Config;
use logservice::handler::Origin;
use logservice::handler::Presentation;
use logservice::handler::WriteResponder;
use logservice::processor::RequestInfo;
use logservice::service::LogService;

fn main() {
    let config = Config::from_json_str(r#"{"debug": true, "problem_json_prefixes": ["/api/"]}"#)
        .unwrap();

    for url in ["/account/settings", "/api/orders/17"] {
        let request = RequestInfo::new(url)
            .with_ip("127.0.0.1")
            .with_method("GET");
        let service = LogService::builder(config.clone())
            .request(request.clone())
            .build()
            .unwrap();

        let presenter = service.http_presenter(WriteResponder::new(io::stdout()), request);
        let mut handler = service.exception_handler(Presentation::Http(presenter));

        let result: Result<(), _> = handler.run(Origin::Request, || {
            service.router().info("handling request");
            Err(Exception::http(503, "database is in maintenance mode"))
        });
        if let Err(handled) = result {
            println!("\n-- responded with {}", handled.status());
        }
    }
}
