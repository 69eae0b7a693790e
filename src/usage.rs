//! Usage text of each subcommand, shown when the operand is `usage` or when
//! the operands do not fit the syntax.

pub const CONNECT: &str = "\
connect syntax:
---------------
unreal-device connect <host_address>
unreal-device connect <host_address> <testcase>
unreal-device connect <host_name>
unreal-device connect <host_name> <testcase>";

pub const DISCONNECT: &str = "\
disconnect syntax:
------------------
unreal-device disconnect <host_address>
unreal-device disconnect <host_name>";

pub const EXECUTE: &str = "\
execute syntax:
---------------
unreal-device execute <cmdline>
unreal-device execute <host_address>::<cmdline>
unreal-device execute <host_name>::<cmdline>";

/// Shown when no address prefix is given and several devices are registered.
pub const EXECUTE_OTHER: &str = "\
execute syntax:
---------------
unreal-device execute <host_address>::<cmdline>
unreal-device execute <host_name>::<cmdline>";

pub const CONFIGURE: &str = "\
configure syntax:
-----------------
unreal-device configure <cfg_reference>
unreal-device configure <host_address>::<cfg_reference>
unreal-device configure <host_name>::<cfg_reference>";

pub const CONFIGURE_OTHER: &str = "\
configure syntax:
-----------------
unreal-device configure <host_address>::<cfg_reference>
unreal-device configure <host_name>::<cfg_reference>";

pub const LOAD: &str = "\
load syntax:
------------
unreal-device load <filename>
unreal-device load <filename> --replace";

pub const VIEW: &str = "\
view syntax:
------------
unreal-device view <host_address>
unreal-device view <host_name>
unreal-device view <host_name> --testcase <testcase>";

pub const RESET: &str = "\
reset syntax:
-------------
unreal-device reset <host_address>
unreal-device reset <host_name>";

/// True when the operands ask for the usage text.
pub fn is_usage_request<S: AsRef<str>>(operands: &[S]) -> bool {
    let joined: String = operands.iter().map(AsRef::as_ref).collect();
    joined.trim().eq_ignore_ascii_case("usage")
}
