fn main() {
    // `embuild` is an optional build-dependency pulled in only by the
    // `espidf` feature; on host builds it is absent, so gate the call.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
