use std::path::PathBuf;

use flagbind_gen::{GenerateOptions, descriptor};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let Some(out_dir) = std::env::var_os("OUT_DIR").map(PathBuf::from) else {
        panic!("OUT_DIR is not set; build.rs must run under cargo");
    };

    let options = GenerateOptions {
        runtime_path: "crate".into(),
        output_module: "crate::generated".into(),
        header: String::new(),
    };
    let package = match flagbind_gen::generate(&descriptor::standard(), &options) {
        Ok(package) => package,
        Err(e) => panic!("flagbind-gen: {e}"),
    };
    if let Err(e) = package.write_to(&out_dir) {
        panic!("flagbind-gen: {e}");
    }
}
