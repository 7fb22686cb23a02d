// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Wire protocol code generator
//!
//! '''bash
//! cargo run --bin wiregen -- --help
//! '''

use structopt::{clap::arg_enum, StructOpt};
use wire_generate::{
    cbor_rpc, json_rpc, protocol, query_rpc, rest_json, rest_xml, GeneratorConfig,
    SourceInstaller,
};
use wire_schema::{Schema, ShapeId};

arg_enum! {
#[derive(Debug, StructOpt)]
enum WireProtocol {
    JsonRpc,
    RestJson,
    RestXml,
    QueryRpc,
    CborRpc,
}
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "Wire protocol code generator",
    about = "Generate protocol marshalling code for a service schema"
)]
struct Options {
    /// Path to the YAML-encoded schema.
    #[structopt(parse(from_os_str))]
    input: std::path::PathBuf,

    /// Fully-qualified id of the service to generate, e.g. "example.widgets#Widgets".
    #[structopt(long)]
    service: String,

    /// Wire protocol to generate for.
    #[structopt(long, possible_values = &WireProtocol::variants(), case_insensitive = true, default_value = "RestJson")]
    protocol: WireProtocol,

    /// Directory where to write generated modules (otherwise print code on stdout).
    #[structopt(long)]
    target_source_dir: Option<std::path::PathBuf>,

    /// Module name for the generated code in the `target_source_dir`.
    #[structopt(long, default_value = "protocol_marshal")]
    module_name: String,

    /// Path of the runtime support crate referenced by emitted code.
    #[structopt(long)]
    runtime_crate: Option<String>,
}

fn main() {
    let options = Options::from_args();
    let content = std::fs::read_to_string(&options.input).expect("input file must be readable");
    let schema = serde_yaml::from_str::<Schema>(content.as_str()).unwrap();
    let service = ShapeId::new(options.service.as_str());

    let mut config = GeneratorConfig::new(options.module_name.clone());
    if let Some(runtime_crate) = options.runtime_crate.clone() {
        config = config.with_runtime_crate(runtime_crate);
    }

    let protocol: Box<dyn protocol::Protocol> = match options.protocol {
        WireProtocol::JsonRpc => Box::new(json_rpc::JsonRpc),
        WireProtocol::RestJson => Box::new(rest_json::RestJson),
        WireProtocol::RestXml => Box::new(rest_xml::RestXml),
        WireProtocol::QueryRpc => Box::new(query_rpc::QueryRpc),
        WireProtocol::CborRpc => Box::new(cbor_rpc::CborRpc),
    };

    let generated =
        protocol::generate_service(&schema, &service, protocol.as_ref(), &config).unwrap();
    for failure in &generated.failures {
        eprintln!(
            "warning: skipped operation {}: {}",
            failure.operation, failure.error
        );
    }

    match options.target_source_dir {
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            generated
                .modules
                .render_with_config(&mut out, Some(&config))
                .unwrap();
        }
        Some(install_dir) => {
            let installer = protocol::Installer::new(install_dir);
            installer.install_service(&config, &generated).unwrap();
        }
    }
}
