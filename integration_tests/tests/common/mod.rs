use std::sync::Once;

use integration_tests::fixture_module_dir;

static INIT: Once = Once::new();

pub fn ensure_test_env() {
    INIT.call_once(|| {
        let module_dir = fixture_module_dir();

        debug_assert!(
            module_dir.join("configs").exists(),
            "missing fixture module dir at {}",
            module_dir.display()
        );

        std::env::set_var("MAP_RESTRICTIONS_MODULE_DIR", &module_dir);
    });
}
