fn main() {
    // --- Windows resource embedding (version info, icon) ---
    // The registered context-menu entries point their `Icon` value at
    // `"<exe>",0`, so the icon has to live inside the executable.
    #[cfg(target_os = "windows")]
    if std::env::var("CARGO_BIN_NAME").is_ok() {
        let mut res = winres::WindowsResource::new();
        if std::path::Path::new("assets/unblock.ico").exists() {
            res.set_icon("assets/unblock.ico");
        }
        res.set("FileDescription", "Unblock downloaded files");
        res.set("ProductName", "unblock");
        res.set("FileVersion", env!("CARGO_PKG_VERSION"));
        res.set("ProductVersion", env!("CARGO_PKG_VERSION"));
        res.compile().expect("failed to compile Windows resources");
    }
    println!("cargo:rerun-if-changed=assets/unblock.ico");
}
