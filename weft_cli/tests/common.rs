use assert_cmd::Command;

pub fn weft_cmd() -> Command {
	Command::cargo_bin("weft").expect("weft binary should build")
}
