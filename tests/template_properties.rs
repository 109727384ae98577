use proptest::prelude::*;

use diaghub::config::{Target, resolve};

fn host_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9]([a-z0-9-]{0,20}[a-z0-9])?(\\.[a-z0-9]{1,10}){0,3}",
        (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
            .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}")),
    ]
}

proptest! {
    #[test]
    fn valid_targets_resolve_completely(host in host_strategy(), port in 1u16..=u16::MAX) {
        let target = Target { host: host.clone(), port };
        let cmd = resolve("nc -vz {host} {port}", &target).unwrap();

        prop_assert_eq!(cmd.as_str(), format!("nc -vz {host} {port}"));
        prop_assert!(!cmd.as_str().contains('{'), "resolved command still contains a brace");
    }

    #[test]
    fn shell_metacharacters_never_reach_the_command(
        prefix in "[a-z0-9]{1,8}",
        bad in prop::sample::select(vec![';', '|', '&', '$', '`', ' ', '>', '<', '\'', '"', '(', ')']),
        suffix in "[a-z0-9]{0,8}",
    ) {
        let target = Target { host: format!("{prefix}{bad}{suffix}"), port: 80 };
        prop_assert!(resolve("ping {host}", &target).is_err(), "expected resolve to fail");
    }

    #[test]
    fn templates_without_host_ignore_the_host_value(host in ".*", port in 1u16..=u16::MAX) {
        let target = Target { host, port };
        let cmd = resolve("ss -tan sport = :{port}", &target).unwrap();
        prop_assert_eq!(cmd.as_str(), format!("ss -tan sport = :{port}"));
    }
}
