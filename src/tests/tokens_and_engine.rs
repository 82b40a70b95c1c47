use std::rc::Rc;

use super::*;

fn extensible() -> Engine {
    let engine = Engine::new();
    engine.install(Feature::Extensibility);
    engine
}

#[test]
fn registering_requires_extensibility() -> Result<()> {
    let engine = Engine::new();
    let err = engine
        .register_token(
            Matcher::native(r"\\a", "")?,
            |_, _, _| Ok(r"\x07".to_string()),
            TokenOptions::new(),
        )
        .expect_err("extensibility is off by default");
    match err {
        Error::Usage(msg) => assert!(msg.contains("extensibility")),
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[test]
fn custom_token_rewrites_syntax() -> Result<()> {
    let engine = extensible();
    engine.register_token(
        Matcher::native(r"\\a", "")?,
        |_, _, _| Ok(r"\x07".to_string()),
        TokenOptions::new(),
    )?;
    let bell = engine.compile(r"x\a", "")?;
    assert_eq!(bell.source(), r"x\x07");
    assert!(test("x\u{7}", &bell, 0, false)?);
    Ok(())
}

#[test]
fn token_scope_limits_where_it_applies() -> Result<()> {
    let engine = extensible();
    let mut options = TokenOptions::new();
    options.scope(Scope::Class);
    engine.register_token(
        Matcher::native("%", "")?,
        |_, scope, _| {
            assert_eq!(scope, Scope::Class);
            Ok("0-9".to_string())
        },
        options,
    )?;
    assert_eq!(engine.compile("%[%]", "")?.source(), "%[0-9]");
    Ok(())
}

#[test]
fn token_flag_gates_the_token_and_registers_the_flag() -> Result<()> {
    let engine = extensible();
    let mut options = TokenOptions::new();
    options.flag("p");
    engine.register_token(
        Matcher::native("%", "")?,
        |_, _, _| Ok(r"\d".to_string()),
        options,
    )?;
    assert_eq!(engine.compile("%", "p")?.source(), r"\d");
    assert_eq!(engine.compile("%", "")?.source(), "%");
    assert_eq!(engine.compile("(?p)%", "")?.source(), r"\d");

    let mut bad = TokenOptions::new();
    bad.flag("pq");
    let err = engine
        .register_token(Matcher::native("&", "")?, |_, _, _| Ok(String::new()), bad)
        .expect_err("flag must be a single character");
    assert!(matches!(err, Error::Usage(_)));
    Ok(())
}

#[test]
fn optional_flags_become_valid_without_gating() -> Result<()> {
    let engine = extensible();
    assert!(matches!(engine.compile("a", "Q"), Err(Error::Syntax(_))));
    let mut options = TokenOptions::new();
    options.optional_flags("Q");
    engine.register_token(
        Matcher::native("%", "")?,
        |_, _, ctx| Ok(if ctx.has_flag('Q') { "q".to_string() } else { "%".to_string() }),
        options,
    )?;
    assert_eq!(engine.compile("%", "Q")?.source(), "q");
    assert_eq!(engine.compile(r"%", "")?.source(), "%");
    Ok(())
}

#[test]
fn trigger_decides_per_position() -> Result<()> {
    let engine = extensible();
    let mut options = TokenOptions::new();
    options.trigger(|ctx| ctx.capture_count() > 0);
    engine.register_token(
        Matcher::native("@", "")?,
        |_, _, _| Ok("at".to_string()),
        options,
    )?;
    assert_eq!(engine.compile("@(x)@", "")?.source(), "@(x)at");
    Ok(())
}

#[test]
fn newest_token_wins_over_older_ones_and_builtins() -> Result<()> {
    let engine = extensible();
    engine.register_token(
        Matcher::native(r"\.", "")?,
        |_, _, _| Ok("first".to_string()),
        TokenOptions::new(),
    )?;
    engine.register_token(
        Matcher::native(r"\.", "")?,
        |_, _, _| Ok("second".to_string()),
        TokenOptions::new(),
    )?;
    assert_eq!(engine.compile("a.", "s")?.source(), "asecond");
    Ok(())
}

#[test]
fn reparsed_output_goes_through_the_builtins() -> Result<()> {
    let engine = extensible();
    let mut options = TokenOptions::new();
    options.reparse(true);
    engine.register_token(
        Matcher::native("@", "")?,
        |_, _, _| Ok("(?<at>x)".to_string()),
        options,
    )?;
    let at = engine.compile("a@", "")?;
    assert_eq!(at.source(), "a(x)");
    assert_eq!(at.capture_names(), names(&[Some("at")]).as_slice());
    Ok(())
}

#[test]
fn runaway_reparsing_is_capped() -> Result<()> {
    let mut engine = extensible();
    engine.set_reparse_limit(50)?;
    let mut options = TokenOptions::new();
    options.reparse(true);
    engine.register_token(Matcher::native("!", "")?, |_, _, _| Ok("!!".to_string()), options)?;
    let err = engine.compile("a!", "").expect_err("expansion never settles");
    match err {
        Error::Usage(msg) => assert!(msg.contains("50")),
        other => panic!("unexpected error: {other:?}"),
    }

    // The engine is usable again after a failed compile.
    assert_eq!(engine.compile("abc", "")?.source(), "abc");
    Ok(())
}

#[test]
fn handlers_register_the_groups_they_emit() -> Result<()> {
    let engine = extensible();
    engine.register_token(
        Matcher::native("<cap>", "")?,
        |_, _, ctx| {
            ctx.add_capture(Some("cap"))?;
            Ok("(".to_string())
        },
        TokenOptions::new(),
    )?;
    engine.register_token(
        Matcher::native("<raw>", "")?,
        |_, _, _| Ok("(".to_string()),
        TokenOptions::new(),
    )?;

    let good = engine.compile("<cap>a)", "")?;
    assert_eq!(good.capture_names(), names(&[Some("cap")]).as_slice());

    let err = engine
        .compile("<raw>a)", "")
        .expect_err("unregistered group must be caught");
    match err {
        Error::Syntax(msg) => assert!(msg.contains("capturing groups")),
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[test]
fn handlers_cannot_reenter_the_engine() -> Result<()> {
    let engine = Rc::new(extensible());
    let weak = Rc::downgrade(&engine);
    engine.register_token(
        Matcher::native("%", "")?,
        move |_, _, _| {
            let engine = weak
                .upgrade()
                .ok_or_else(|| Error::Usage("engine dropped".to_string()))?;
            engine.compile("x", "")?;
            Ok("x".to_string())
        },
        TokenOptions::new(),
    )?;
    let err = engine.compile("%", "").expect_err("nested compile must fail");
    assert!(matches!(err, Error::Usage(_)));
    Ok(())
}

#[test]
fn uninstalling_blocks_registration_but_keeps_tokens() -> Result<()> {
    let engine = extensible();
    engine.register_token(
        Matcher::native("%", "")?,
        |_, _, _| Ok("pct".to_string()),
        TokenOptions::new(),
    )?;
    engine.uninstall(Feature::Extensibility);
    assert!(!engine.is_installed(Feature::Extensibility));
    assert!(matches!(
        engine.register_token(Matcher::native("&", "")?, |_, _, _| Ok(String::new()), TokenOptions::new()),
        Err(Error::Usage(_))
    ));
    assert_eq!(engine.compile("%", "")?.source(), "pct");
    Ok(())
}

#[test]
fn feature_lists_parse() -> Result<()> {
    assert_eq!(Feature::parse_list("all")?, vec![Feature::Extensibility]);
    assert_eq!(
        Feature::parse_list(" extensibility ")?,
        vec![Feature::Extensibility]
    );
    assert!(matches!(Feature::parse_list("natives"), Err(Error::Usage(_))));

    let engine = Engine::new();
    engine.install_features("all")?;
    assert!(engine.is_installed(Feature::Extensibility));
    engine.uninstall_features("extensibility")?;
    assert!(!engine.is_installed(Feature::Extensibility));
    Ok(())
}

#[test]
fn cache_returns_the_same_matcher() -> Result<()> {
    let engine = Engine::new();
    let first = engine.cache(r"\d+", "g")?;
    let second = engine.cache(r"\d+", "g")?;
    assert!(Rc::ptr_eq(&first, &second));

    let other_flags = engine.cache(r"\d+", "")?;
    assert!(!Rc::ptr_eq(&first, &other_flags));
    assert_eq!(engine.cached_len(), 2);

    engine.flush_cache();
    assert_eq!(engine.cached_len(), 0);
    let third = engine.cache(r"\d+", "g")?;
    assert!(!Rc::ptr_eq(&first, &third));
    Ok(())
}

#[test]
fn copy_adjusts_flags_and_resets_cursor() -> Result<()> {
    let engine = Engine::new();
    let original = engine.compile(r"(?<word>\w+) . ", "gx")?;
    original.set_last_index(3);

    let copied = engine.copy(&original, "is", "g")?;
    assert_eq!(copied.last_index(), 0);
    assert!(!copied.global());
    assert!(copied.ignore_case());
    assert_eq!(copied.precompilation_flags(), Some("xis"));
    assert_eq!(copied.precompilation_source(), original.precompilation_source());
    assert_eq!(copied.capture_names(), original.capture_names());
    assert_eq!(copied.source(), r"(\w+)(?:)[\s\S](?:)");
    assert_eq!(original.last_index(), 3);

    let global = engine.globalize(&engine.compile("a", "")?)?;
    assert!(global.global());
    Ok(())
}

#[test]
fn copying_native_matchers_keeps_them_native() -> Result<()> {
    let engine = Engine::new();
    let plain = Matcher::native("(?<n>a)", "i")?;
    let copied = engine.copy(&plain, "g", "")?;
    assert!(copied.is_native());
    assert_eq!(copied.flags(), "gi");
    assert_eq!(copied.capture_names(), names(&[Some("n")]).as_slice());
    Ok(())
}

#[test]
fn configuration_setters_reject_zero() {
    let mut engine = Engine::new();
    assert!(matches!(engine.set_reparse_limit(0), Err(Error::Usage(_))));
    assert!(matches!(engine.set_trace_log_limit(0), Err(Error::Usage(_))));
    assert_eq!(engine.reparse_limit(), 10_000);
}

#[test]
fn trace_log_records_compiles() -> Result<()> {
    let mut engine = Engine::new();
    engine.enable_trace(true);
    engine.set_trace_stderr(false);
    engine.set_trace_log_limit(2)?;
    engine.compile("a", "")?;
    engine.compile("b", "i")?;
    engine.compile("c", "")?;

    let logs = engine.take_trace_logs();
    assert_eq!(logs.len(), 2);
    assert!(logs[0].starts_with("[compile] /b/i"), "{logs:?}");
    assert!(logs[1].starts_with("[compile] /c/"), "{logs:?}");
    assert!(engine.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn lowering_trace_limit_keeps_newest_lines() -> Result<()> {
    let mut engine = Engine::new();
    engine.enable_trace(true);
    engine.set_trace_stderr(false);
    for pattern in ["a", "b", "c"] {
        engine.compile(pattern, "")?;
    }
    engine.set_trace_log_limit(1)?;
    let logs = engine.take_trace_logs();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].starts_with("[compile] /c/"), "{logs:?}");
    Ok(())
}
