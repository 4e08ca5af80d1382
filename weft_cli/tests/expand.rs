mod common;

use predicates::prelude::PredicateBooleanExt;
use weft_core::AnyEmptyResult;

#[test]
fn expands_includes_relative_to_the_input_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("lib"))?;
	std::fs::write(
		tmp.path().join("app.js"),
		"//= lib/util\nutil();\n",
	)?;
	std::fs::write(tmp.path().join("lib/util.js"), "function util() {}")?;

	let mut cmd = common::weft_cmd();
	let _ = cmd
		.arg(tmp.path().join("app.js"))
		.assert()
		.success()
		.stdout(
			predicates::str::contains("function util() {}").and(predicates::str::contains("util();")),
		);

	Ok(())
}

#[test]
fn writes_the_expanded_output_to_a_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("app.js"), "//= part\n")?;
	std::fs::write(tmp.path().join("part.js"), "PART")?;

	let out_path = tmp.path().join("out.js");
	let mut cmd = common::weft_cmd();
	let _ = cmd
		.arg(tmp.path().join("app.js"))
		.arg("--output")
		.arg(&out_path)
		.assert()
		.success();

	assert_eq!(std::fs::read_to_string(out_path)?, "PART");

	Ok(())
}

#[test]
fn fails_on_missing_targets() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("app.js"), "//= missing\n")?;

	let mut cmd = common::weft_cmd();
	let _ = cmd
		.arg(tmp.path().join("app.js"))
		.assert()
		.failure()
		.stderr(predicates::str::contains("unable to find target"));

	Ok(())
}

#[test]
fn tolerant_flag_degrades_missing_targets() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("app.js"), "before\n//= missing\nafter\n")?;

	let mut cmd = common::weft_cmd();
	let _ = cmd
		.arg(tmp.path().join("app.js"))
		.arg("--tolerant")
		.assert()
		.success()
		.stdout(predicates::str::contains("before").and(predicates::str::contains("after")));

	Ok(())
}

#[test]
fn keep_going_reports_failures_without_aborting() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("app.js"),
		"//= missing\nsurvivor();\n",
	)?;

	let mut cmd = common::weft_cmd();
	let _ = cmd
		.arg(tmp.path().join("app.js"))
		.arg("--keep-going")
		.assert()
		.success()
		.stdout(predicates::str::contains("survivor();"));

	Ok(())
}

#[test]
fn aliases_are_registered_from_the_command_line() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("third_party"))?;
	std::fs::write(tmp.path().join("app.js"), "//= vendor!lib\n")?;
	std::fs::write(tmp.path().join("third_party/lib.js"), "VENDORED")?;

	let mut cmd = common::weft_cmd();
	let _ = cmd
		.arg(tmp.path().join("app.js"))
		.arg("--alias")
		.arg(format!("vendor={}", tmp.path().join("third_party").display()))
		.assert()
		.success()
		.stdout(predicates::str::contains("VENDORED"));

	Ok(())
}

#[test]
fn settings_interpolate_into_later_targets() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("app.js"),
		"//=set flavor \"vanilla\"\n//= part-{{flavor}}\n",
	)?;
	std::fs::write(tmp.path().join("part-vanilla.js"), "VANILLA")?;

	let mut cmd = common::weft_cmd();
	let _ = cmd
		.arg(tmp.path().join("app.js"))
		.assert()
		.success()
		.stdout(predicates::str::contains("VANILLA"));

	Ok(())
}
