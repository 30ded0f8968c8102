//! Generation of the runtime decode support file.
//!
//! The generated HLSL declares one `uniform float` per key bit, named after
//! the bit's animator parameter, and a `ShroudDecode` function that subtracts
//! the keyed displacement using the offsets stored in uv channels 6 and 7.
//! The schedule constants are baked in; the bits are only known at runtime.

use std::fmt::Write;

use shroud_core::key::KeySchedule;

use crate::error::PatchError;

/// File name of the decode support file, written next to each patched root.
pub const DECODE_FILE_NAME: &str = "ShroudDecode.cginc";

/// Name of the generated reconstruction function.
pub const DECODE_FUNCTION: &str = "ShroudDecode";

/// `#include` line referencing the decode file from a file in `from_dir`
/// when the decode file lives in `decode_dir`.
pub fn include_directive(from_dir: &str, decode_dir: &str) -> String {
    format!(
        "#include \"{}{DECODE_FILE_NAME}\"",
        relative_dir(from_dir, decode_dir)
    )
}

/// Relative path prefix (empty or ending in `/`) leading from `from` to `to`.
fn relative_dir(from: &str, to: &str) -> String {
    let from: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = String::new();
    for _ in common..from.len() {
        out.push_str("../");
    }
    for segment in &to[common..] {
        out.push_str(segment);
        out.push('/');
    }
    out
}

/// Generate the decode support file for `schedule`, reading bit `i` from the
/// uniform `bit_names[i]`.
pub fn decode_fragment(schedule: &KeySchedule, bit_names: &[String]) -> Result<String, PatchError> {
    if schedule.len() != bit_names.len() {
        return Err(PatchError::NameCountMismatch {
            names: bit_names.len(),
            bits: schedule.len(),
        });
    }

    let half = schedule.len() / 2;
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "// Generated by shroud. Do not edit.");
    let _ = writeln!(out, "#ifndef SHROUD_DECODE_INCLUDED");
    let _ = writeln!(out, "#define SHROUD_DECODE_INCLUDED");
    let _ = writeln!(out);
    for name in bit_names {
        let _ = writeln!(out, "uniform float {name};");
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "float3 {DECODE_FUNCTION}(float3 vertex, float3 normal, float2 offsetA, float2 offsetB)"
    );
    let _ = writeln!(out, "{{");
    let _ = writeln!(out, "    float amount = 0;");
    for (i, ((on, off), name)) in schedule.pairs().zip(bit_names).enumerate() {
        let offset = if i < half { "offsetA" } else { "offsetB" };
        let component = if i % 2 == 0 { "x" } else { "y" };
        let _ = writeln!(
            out,
            "    amount += {offset}.{component} * lerp({off:?}, {on:?}, {name});"
        );
    }
    let _ = writeln!(out, "    return vertex - normal * amount;");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "#endif");
    Ok(out)
}
