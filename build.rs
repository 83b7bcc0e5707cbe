fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Build-time provisioning values are read with `option_env!`.
    for key in [
        "CHECKIN_WIFI_SSID",
        "CHECKIN_WIFI_PASSWORD",
        "CHECKIN_BROKER",
        "CHECKIN_BROKER_PORT",
        "CHECKIN_BROKER_AUTH",
        "CHECKIN_USERNAME",
        "CHECKIN_PASSWORD",
        "CHECKIN_TOPIC_PREFIX",
        "CHECKIN_CLIENT_ID",
    ] {
        println!("cargo:rerun-if-env-changed={key}");
    }

    // Host builds (tests, fuzzing) run without the ESP-IDF toolchain.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
