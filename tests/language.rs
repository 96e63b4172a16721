use anyhow::{bail, Result};
use loxtree::{Error, InterpretError, Interpreter, RuntimeErrorKind, SyntaxError};

// run code against a fresh interpreter and return everything it printed
fn run(code: &str) -> Result<String> {
    let mut interpreter = Interpreter::new(Vec::new());
    loxtree::run(code, &mut interpreter)?;
    Ok(String::from_utf8(interpreter.into_output())?)
}

#[test]
fn variable_scoping() -> Result<()> {
    let code = "\
        var a = \"global a\";\n\
        var b = \"global b\";\n\
        var c = \"global c\";\n\
        {\n\
            var a = \"outer a\";\n\
            var b = \"outer b\";\n\
            {\n\
                var a = \"inner a\";\n\
                print a;\n\
                print b;\n\
                print c;\n\
            }\n\
            print a;\n\
            print b;\n\
            print c;\n\
        }\n\
        print a;\n\
        print b;\n\
        print c;";

    let expected = "\
        inner a\n\
        outer b\n\
        global c\n\
        outer a\n\
        outer b\n\
        global c\n\
        global a\n\
        global b\n\
        global c\n";

    assert_eq!(expected, run(code)?);
    Ok(())
}

#[test]
fn shadowing_inside_block() -> Result<()> {
    assert_eq!("2\n1\n", run("var x = 1; { var x = 2; print x; } print x;")?);
    Ok(())
}

#[test]
fn assignment_reaches_enclosing_scope() -> Result<()> {
    let code = "var a = 1; { a = a + 1; { a = a * 10; } } print a;";
    assert_eq!("20\n", run(code)?);
    Ok(())
}

#[test]
fn chained_assignment() -> Result<()> {
    let code = "var a = 1; var b = 2; print a = b = 3; print a; print b;";
    assert_eq!("3\n3\n3\n", run(code)?);
    Ok(())
}

#[test]
fn uninitialized_variable_is_nil() -> Result<()> {
    assert_eq!("nil\n", run("var a; print a;")?);
    Ok(())
}

#[test]
fn if_statement_with_blocks() -> Result<()> {
    let code = "\
        var a = \"do it\";\n\
        if (a) {\n\
            print \"condition was true\";\n\
        } else {\n\
            print \"condition was false\";\n\
        }\n\
        if (nil) print \"never\"; else { print \"else\"; }";

    assert_eq!("condition was true\nelse\n", run(code)?);
    Ok(())
}

#[test]
fn short_circuit_never_divides() -> Result<()> {
    assert_eq!("false\ntrue\n", run("print false and (1/0); print true or (1/0);")?);
    Ok(())
}

#[test]
fn string_concatenation() -> Result<()> {
    assert_eq!("foobar\n", run("var a = \"foo\"; print a + \"bar\";")?);
    Ok(())
}

#[test]
fn undefined_read_is_a_runtime_error() -> Result<()> {
    let mut interpreter = Interpreter::new(Vec::new());
    match loxtree::run("print 1;\nprint y;", &mut interpreter) {
        Err(Error::Interpret(InterpretError::Runtime(error))) => {
            assert_eq!(error.token.lexeme, "y");
            assert_eq!(error.line(), 2);
            assert_eq!(error.kind, RuntimeErrorKind::UndefinedVariable("y".into()));
        }
        other => bail!("expected undefined variable error, got {other:?}"),
    }
    assert_eq!(interpreter.output(), b"1\n");
    Ok(())
}

#[test]
fn assigning_undeclared_variable_fails() {
    let result = run("y = 1;");
    assert!(result.is_err());
}

#[test]
fn type_error_messages_match() {
    let message = |code: &str| match run(code) {
        Err(error) => error.to_string(),
        Ok(output) => panic!("expected an error, printed {output:?}"),
    };

    assert_eq!(message("\"a\" - 1;"), "Operands must be numbers.\n[line 1]");
    assert_eq!(
        message("nil + 1;"),
        "Operands must be two numbers or two strings.\n[line 1]"
    );
    assert_eq!(message("\"a\" * 2;"), "Operand must be a number.\n[line 1]");
    assert_eq!(message("\"a\" / 2;"), "Operand must be a number.\n[line 1]");
}

#[test]
fn two_syntax_errors_are_both_reported() -> Result<()> {
    let mut interpreter = Interpreter::new(Vec::new());
    let result = loxtree::run("print 1; var = 2; print 3; print (4; print 5;", &mut interpreter);

    let errors = match result {
        Err(Error::Syntax(errors)) => errors,
        other => bail!("expected syntax errors, got {other:?}"),
    };
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|error| matches!(error, SyntaxError::Parse(_))));
    // nothing runs when the source has syntax errors
    assert!(interpreter.output().is_empty());
    Ok(())
}

#[test]
fn lex_errors_are_reported_before_parse_errors() -> Result<()> {
    let mut interpreter = Interpreter::new(Vec::new());
    let result = loxtree::run("print 1 @;\nprint ;", &mut interpreter);

    let errors = match result {
        Err(Error::Syntax(errors)) => errors,
        other => bail!("expected syntax errors, got {other:?}"),
    };
    assert_eq!(
        errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec![
            "[line 1] Error: Unexpected character.",
            "[line 2] Error at ';': Expect expression.",
        ]
    );
    assert_eq!(errors[1].line(), 2);
    Ok(())
}

#[test]
fn globals_persist_between_runs() -> Result<()> {
    let mut interpreter = Interpreter::new(Vec::new());
    loxtree::run("var greeting = \"hi\";", &mut interpreter)?;
    assert!(loxtree::run("print missing;", &mut interpreter).is_err());
    loxtree::run("print greeting;", &mut interpreter)?;

    assert_eq!(interpreter.output(), b"hi\n");
    Ok(())
}
