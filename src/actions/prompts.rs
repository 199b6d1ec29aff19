//! Prompt templates. Placeholders are `{name}` and are filled by [`render`].

pub const WRITE_ALGORITHM_CODE: &str = r#"You are an expert in C++ and High-Level Synthesis (HLS). Translate the algorithm description below into a synthesizable C++ implementation.

[Algorithm description]
{description}

[Header file]
{header}

[Requirements]
- {include_line}
- Implement the top function named in the description and every helper it calls.
- Do not write a main function or any test code.
- Include standard headers only when the implementation needs them.
- Do not add HLS pragmas or Vitis-specific headers.
- Comment the key steps briefly.
- Return the code as ```cpp ... ``` with no other text."#;

pub const FIX_COMPILE_ERROR: &str = r#"You are an expert C++ engineer. The code below fails to compile.

[Source code]
{code}

[Compiler output]
{diagnostics}

[Requirements]
- Locate the lines responsible for each diagnostic and change only what is needed to compile.
- Keep the behaviour of the code unchanged.
- Do not add a main function or test code.
- Return the corrected code as ```cpp ... ``` with no other text."#;

pub const FIX_C_CODE: &str = r#"You are an expert C++ engineer. The code below compiles but fails its tests or crashes.

[Source code]
{code}

[Test output]
{error}

[Test harness]
{harness}

[Requirements]
- Decide whether the failure comes from the implementation, then fix only the implementation.
- Follow the algorithm description exactly:
{description}
- Return the corrected implementation as ```cpp ... ``` with no other text."#;

pub const DESIGN_IO_REFERENCE: &str = r#"You are a verification engineer. For the algorithm below, design {cases} representative test vectors, including edge cases.

[Algorithm description]
{description}

[Requirements]
- For each vector give the exact inputs and the exact expected outputs.
- Compute expected outputs by hand, step by step, before writing them down.
- Return plain text, one vector per block, no code."#;

pub const WRITE_TEST_CASE: &str = r#"You are a verification engineer. Write C++ assertions that check an implementation of the algorithm below against the reference vectors.

[Algorithm description]
{description}

[Header file]
{header}

[Reference vectors]
{reference}

[Requirements]
- Write a `main` function that calls the top function with each input vector and compares the result with the expected output.
- Print a short message and return a non-zero exit code on the first mismatch; return 0 when every vector matches.
- Do not re-implement the algorithm and do not include the implementation file.
- Return the code as ```cpp ... ``` with no other text."#;

pub const REPAIR_HLS_CODE: &str = r#"You are a Vitis HLS expert. Rewrite the C++ code below so that it is fully synthesizable.

[Source code]
{code}

[Requirements]
- Remove dynamic memory allocation, recursion, unsupported pointer usage and unsupported library calls.
- Keep the top function signature and the behaviour unchanged.
- Do not add optimization pragmas.
- Return the code as ```cpp ... ``` with no other text."#;

pub const FIX_HLS_CODE: &str = r#"You are a Vitis HLS expert. The code below failed in the HLS flow.

[Source code]
{code}

[Tool log]
{log}

[Requirements]
- Find the construct the log points at and rewrite it in a synthesizable form.
- Keep the top function signature and the behaviour unchanged.
- Return the corrected code as ```cpp ... ``` with no other text."#;

pub const PREPROCESS_HLS_CODE: &str = r#"You are a senior HLS engineer. Rewrite the HLS source below into a canonical, synthesis-friendly form. This is a structural rewrite, not a pragma pass.

[Source code]
{code}

[Transformations, applied in order and only where they fit]
1. Make purely internal, constant-sized local arrays `static` when they need no reset between calls.
2. Replace hand-written min, max and abs logic with the hls:: equivalents.
3. Canonicalize loops: constant bounds, single exit, no `break` or `continue` where avoidable.
4. Linearize memory access: compute indices from loop counters instead of moving pointers.

[Requirements]
- Preserve functional behaviour and the top function signature.
- If no transformation applies, return the code unchanged.
- Return the code as ```cpp ... ``` with no other text."#;

pub const CHOOSE_OPTIMIZATIONS: &str = r#"You are a Vitis HLS performance expert. These pragmas are available:
{catalog}

[Source code]
{code}

[Task]
Choose only the pragmas that clearly improve this code. Do not rewrite the code.
Answer strictly as [option_1, option_2, ...] using the names above, or `null` if no pragma helps."#;

pub const APPLY_OPTIMIZATIONS: &str = r#"You are a Vitis HLS performance expert. Insert the pragmas listed below into the source code.

[Source code]
{code}

[Header file, for constants only]
{header}

[Pragmas to apply]
{pragmas}

[Requirements]
- Use `complete` array partitioning only for dimensions of 20 or fewer; otherwise use `block` or `cyclic` with a sensible factor.
- Place `array_partition` right after the array declaration.
- Prefer pipelining the innermost loop unless its trip count is tiny.
- Do not change existing code; only insert pragmas.
- Do not repeat the header contents.
- Return the code as ```cpp ... ``` with no other text."#;

pub const FIX_HLS_OPT: &str = r#"You are a Vitis HLS performance expert. Synthesis of the optimized code below failed.

[Source code]
{code}

[Tool log]
{log}

[Requirements]
- Adjust or remove the offending pragmas; keep every pragma that is not at fault.
- Do not change the algorithm.
- Return the corrected code as ```cpp ... ``` with no other text."#;

pub const APPLY_LOOP_STRATEGY: &str = r#"You are a senior HLS engineer. Restructure the loops of the HLS source below before any pragma is added.

[Algorithm description]
{description}

[Source code]
{code}

[Strategies]
{strategies}

[Requirements]
- Apply a strategy only where its conditions hold; several may apply, one may apply more than once.
- Never reorder or merge loops across a data dependence.
- Preserve functional behaviour and the top function signature.
- Do not add pragmas.
- If no strategy applies, return the code unchanged.
- Return the code as ```cpp ... ``` with no other text."#;

/// One loop restructuring the reviewer may apply.
pub struct LoopStrategy {
    pub name: &'static str,
    pub when: &'static str,
    pub rule: &'static str,
    pub example: &'static str,
}

pub const LOOP_STRATEGIES: &[LoopStrategy] = &[
    LoopStrategy {
        name: "loop merging",
        when: "sibling loops with the same bounds and step, no data flowing from one into the next, and disjoint arrays",
        rule: "fuse them into one loop whose body runs the original bodies in order",
        example: "for (int i = 0; i < N; ++i) A[i] = B[i] + 1;\nfor (int i = 0; i < N; ++i) C[i] = D[i] * 2;\n// becomes\nfor (int i = 0; i < N; ++i) {\n    A[i] = B[i] + 1;\n    C[i] = D[i] * 2;\n}",
    },
    LoopStrategy {
        name: "loop interchange",
        when: "a loop nest whose inner loop walks memory with a non-unit stride, or a short outer loop over a long inner one",
        rule: "swap the loops so the innermost one touches contiguous elements",
        example: "for (int j = 0; j < N; ++j)\n    for (int i = 0; i < M; ++i) A[i][j] += 1;\n// becomes\nfor (int i = 0; i < M; ++i)\n    for (int j = 0; j < N; ++j) A[i][j] += 1;",
    },
    LoopStrategy {
        name: "loop tiling",
        when: "nested loops over large arrays with regular access where on-chip buffer reuse limits throughput",
        rule: "split each loop into a tile loop and an in-tile loop, guarding bounds that the tile size does not divide",
        example: "for (int ii = 0; ii < N; ii += T)\n    for (int i = ii; i < ii + T && i < N; ++i)\n        A[i] += B[i];",
    },
];

pub fn loop_strategy_catalog() -> String {
    LOOP_STRATEGIES
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "{}. {}\nWhen: {}\nRule: {}\nExample:\n{}",
                i + 1,
                s.name,
                s.when,
                s.rule,
                s.example
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One optimization the analyzer may choose.
pub struct Pragma {
    pub name: &'static str,
    pub when: &'static str,
    pub example: &'static str,
}

pub const PRAGMAS: &[Pragma] = &[
    Pragma {
        name: "pipeline",
        when: "loops whose iterations are independent or have short dependence chains",
        example: "for (int i = 0; i < N; i++) {\n#pragma HLS pipeline II=1\n    out[i] = in[i] * k;\n}",
    },
    Pragma {
        name: "unroll",
        when: "small loops with constant trip counts, or to expose parallelism to a pipeline",
        example: "for (int j = 0; j < 4; j++) {\n#pragma HLS unroll\n    acc[j] += x[j];\n}",
    },
    Pragma {
        name: "array_partition",
        when: "arrays read or written several times per cycle by a pipelined or unrolled loop",
        example: "int buf[16];\n#pragma HLS array_partition variable=buf complete dim=1",
    },
    Pragma {
        name: "dataflow",
        when: "a function made of sequential stages that communicate through arrays or streams",
        example: "void top(...) {\n#pragma HLS dataflow\n    load(...);\n    compute(...);\n    store(...);\n}",
    },
    Pragma {
        name: "inline",
        when: "small helper functions whose call overhead blocks pipelining",
        example: "int mac(int a, int b, int c) {\n#pragma HLS inline\n    return a * b + c;\n}",
    },
];

/// Look up a pragma by name; "loop pipeline" matches "pipeline".
pub fn pragma(option: &str) -> Option<&'static Pragma> {
    let key = option.split_whitespace().last()?.to_ascii_lowercase();
    PRAGMAS.iter().find(|p| p.name == key)
}

pub fn pragma_catalog() -> String {
    PRAGMAS
        .iter()
        .map(|p| format!("- {}: {}", p.name, p.when))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fill `{key}` placeholders.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_fills_every_occurrence() {
        let out = render("{a} and {a} but {b}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and x but y");
    }

    #[test]
    fn pragma_lookup_uses_last_word() {
        assert_eq!(pragma("loop pipeline").unwrap().name, "pipeline");
        assert_eq!(pragma("ARRAY_PARTITION").unwrap().name, "array_partition");
        assert!(pragma("bind_storage").is_none());
        assert!(pragma("").is_none());
    }

    #[test]
    fn loop_catalog_lists_every_strategy_with_its_example() {
        let catalog = loop_strategy_catalog();
        assert!(catalog.starts_with("1. loop merging"));
        assert!(catalog.contains("2. loop interchange"));
        assert!(catalog.contains("3. loop tiling"));
        assert!(catalog.contains("ii += T"));
    }

    #[test]
    fn templates_leave_no_known_placeholder_behind() {
        let out = render(
            FIX_HLS_CODE,
            &[("code", "int f();"), ("log", "ERROR: [HLS 214-123]")],
        );
        assert!(!out.contains("{code}"));
        assert!(!out.contains("{log}"));
        assert!(out.contains("ERROR: [HLS 214-123]"));
    }
}
