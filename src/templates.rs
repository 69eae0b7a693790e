//! Built-in device-info document.
//!
//! Seeded into the home directory the first time the registry is loaded so a
//! fresh install has a device to connect to.

/// Sample device-info document written when none exists yet.
pub const SAMPLE_DEVICES_INFO: &str = r#"127.0.0.1:
  name: localhost
  login: |-
    User Access Verification

    localhost>
  cmdlines:
    show version: |-
      Cisco IOS Software, C2960 Software (C2960-LANBASEK9-M), Version 12.2(55)SE7
      localhost uptime is 1 week, 2 days, 3 hours, 4 minutes
    show clock:
      - "*10:15:01.123 UTC Mon Mar 1 2021"
      - "*10:15:31.456 UTC Mon Mar 1 2021"
      - "*10:16:01.789 UTC Mon Mar 1 2021"
    show ip interface brief: |-
      Interface              IP-Address      OK? Method Status                Protocol
      Vlan1                  127.0.0.1       YES manual up                    up
      FastEthernet0/1        unassigned      YES unset  up                    up
  testcases:
    interface_down:
      show ip interface brief: |-
        Interface              IP-Address      OK? Method Status                Protocol
        Vlan1                  127.0.0.1       YES manual up                    up
        FastEthernet0/1        unassigned      YES unset  administratively down down
  hostname: |-
    localhost(config)#hostname localhost
    localhost(config)#
"#;
