use std::env;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
	let out_dir = PathBuf::from(env::var("OUT_DIR")?);
	let descriptor_path = out_dir.join("authguard_descriptor.bin");

	let mut config = prost_build::Config::new();
	config
		.file_descriptor_set_path(&descriptor_path)
		.extern_path(".google.protobuf.Struct", "::prost_wkt_types::Struct")
		.extern_path(".google.protobuf.Value", "::prost_wkt_types::Value")
		.extern_path(".google.protobuf.Timestamp", "::prost_wkt_types::Timestamp")
		.type_attribute(".authguard.v1", "#[derive(serde::Serialize, serde::Deserialize)]")
		.type_attribute(".authguard.v1", "#[serde(rename_all = \"camelCase\")]");

	tonic_prost_build::configure()
		.build_server(true)
		.build_client(true)
		.compile_with_config(config, &["proto/auth.proto"], &["proto"])?;

	prost_wkt_build::add_serde(out_dir, descriptor_path)?;

	println!("cargo:rerun-if-changed=proto/auth.proto");
	Ok(())
}
