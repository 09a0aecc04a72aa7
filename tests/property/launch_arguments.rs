use proptest::prelude::*;
use seattle_installer::engine::InstallRequest;

fn iface_strategy() -> impl Strategy<Value = String> {
    "[a-z]{2,5}[0-9]"
}

proptest! {
    // Structure of the installer command line for arbitrary requests:
    // percent first, then the fixed startup flag, then one pair of flags per
    // interface in order, the exclusivity flag once, and the extra string last.
    #[test]
    fn launch_arguments_follow_fixed_order(
        percent in proptest::option::of(0u8..=100),
        interfaces in proptest::collection::vec(iface_strategy(), 0..5),
        extra in proptest::option::of("[a-z -]{1,20}"),
    ) {
        let mut request = InstallRequest::new().with_interfaces(interfaces.clone());
        if let Some(p) = percent {
            request = request.with_percent(p);
        }
        if let Some(e) = &extra {
            request = request.with_extra_arguments(e.clone());
        }

        let args = request.launch_arguments();

        prop_assert_eq!(&args[0], "--percent");
        prop_assert_eq!(args[1].clone(), percent.unwrap_or(50).to_string());
        prop_assert_eq!(&args[2], "--disable-startup-script");
        prop_assert_eq!(&args[3], "True");

        for (i, iface) in interfaces.iter().enumerate() {
            let at = 4 + i * 4;
            prop_assert_eq!(&args[at], "--nm-iface");
            prop_assert_eq!(&args[at + 1], iface);
            prop_assert_eq!(&args[at + 2], "--repy-iface");
            prop_assert_eq!(&args[at + 3], iface);
        }

        let nootherips = args.iter().filter(|a| *a == "--repy-nootherips").count();
        prop_assert_eq!(nootherips, usize::from(!interfaces.is_empty()));

        let expected_len = 4
            + interfaces.len() * 4
            + usize::from(!interfaces.is_empty())
            + usize::from(extra.is_some());
        prop_assert_eq!(args.len(), expected_len);

        if let Some(e) = &extra {
            prop_assert_eq!(args.last(), Some(e));
        }
    }
}
