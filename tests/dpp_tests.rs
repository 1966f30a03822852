// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// tests/dpp_tests.rs - Include all DPP test modules

mod dpp {
    mod common;
    mod test_conf_results;
    mod test_csr;
    mod test_engine;
    mod test_network_intro;
    mod test_provisioning;
}
