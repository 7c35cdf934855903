fn main() {
    // Emits ESP-IDF link/env metadata when targeting espidf; no-op on host.
    embuild::espidf::sysenv::output();
}
