// Parser for textual type expressions.
//
// Parses a token stream (from the lexer) into a `TypeExpr`. Uses chumsky
// combinators. Grammar:
//
//   decl      := type '?'?
//   type      := name type_args? ('[' ']')*
//   type_args := '<' type (',' type)* '>'
//   name      := IDENT ('.' IDENT)*
//
// A single-segment name that is a primitive keyword becomes a primitive.
//
// Preconditions: none.
// Postconditions: returns a type declaration plus any errors (non-fatal).
// Failure modes: syntax errors produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::lexer::Token;
use crate::types::{Primitive, TypeExpr};

/// A parsed type plus its nullability marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub ty: TypeExpr,
    pub nullable: bool,
}

/// Result of parsing: declaration plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub decl: Option<TypeDecl>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Type text that failed to lex or parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type `{text}`: {}", .messages.join("; "))]
pub struct TypeSyntaxError {
    pub text: String,
    pub messages: Vec<String>,
}

/// Parse type text with an optional trailing `?`. Lexes then parses.
pub fn parse_type_decl(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = decl_parser(source);
    let (decl, parse_errors) = parser.parse(stream).into_output_errors();

    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        decl: if all_errors.is_empty() { decl } else { None },
        errors: all_errors,
    }
}

/// Parse type text into a declaration, folding errors into one value.
pub fn parse_decl(source: &str) -> Result<TypeDecl, TypeSyntaxError> {
    let result = parse_type_decl(source);
    match result.decl {
        Some(decl) if result.errors.is_empty() => Ok(decl),
        _ => Err(TypeSyntaxError {
            text: source.to_string(),
            messages: result.errors.iter().map(|e| e.to_string()).collect(),
        }),
    }
}

/// Parse type text that must not carry a nullability marker.
pub fn parse_type(source: &str) -> Result<TypeExpr, TypeSyntaxError> {
    let decl = parse_decl(source)?;
    if decl.nullable {
        return Err(TypeSyntaxError {
            text: source.to_string(),
            messages: vec!["nullability marker not allowed here".to_string()],
        });
    }
    Ok(decl.ty)
}

// ── Parser builder ──

fn decl_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, TypeDecl, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    let ident = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        source[span.start()..span.end()].to_string()
    });

    let ty = recursive(|ty| {
        let name = ident
            .clone()
            .separated_by(just(Token::Dot))
            .at_least(1)
            .collect::<Vec<String>>();

        let type_args = ty
            .separated_by(just(Token::Comma))
            .at_least(1)
            .collect::<Vec<TypeExpr>>()
            .delimited_by(just(Token::Lt), just(Token::Gt));

        let dims = just(Token::LBracket)
            .then(just(Token::RBracket))
            .repeated()
            .collect::<Vec<_>>();

        name.then(type_args.or_not())
            .then(dims)
            .try_map(|((segments, args), dims), span: SimpleSpan| {
                let primitive = match segments.as_slice() {
                    [single] => Primitive::from_keyword(single),
                    _ => None,
                };
                let base = match (primitive, args) {
                    (Some(p), None) => TypeExpr::Primitive(p),
                    (Some(p), Some(_)) => {
                        return Err(Rich::custom(
                            span,
                            format!("primitive type `{}` cannot take type arguments", p.keyword()),
                        ));
                    }
                    (None, args) => TypeExpr::Declared {
                        name: segments.join("."),
                        args: args.unwrap_or_default(),
                    },
                };
                Ok(dims.iter().fold(base, |t, _| TypeExpr::array_of(t)))
            })
    });

    ty.then(just(Token::Question).or_not())
        .map(|(ty, q)| TypeDecl {
            ty,
            nullable: q.is_some(),
        })
        .then_ignore(end())
}
