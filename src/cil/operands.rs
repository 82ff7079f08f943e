use super::Token;
use std::collections::BTreeMap;

/// Turns raw tokens and indices into higher-level values while disassembling
///
/// Returning `None` is not an error: the operand just stays raw.
pub trait OperandResolver {
    type Member;
    type Variable;
    type Parameter;

    fn resolve_member(&self, token: Token) -> Option<Self::Member>;
    fn resolve_string(&self, token: Token) -> Option<String>;
    fn resolve_local(&self, index: u16) -> Option<Self::Variable>;
    fn resolve_parameter(&self, index: u16) -> Option<Self::Parameter>;
}

/// Turns higher-level values back into raw tokens and indices while assembling
///
/// For round-trips to be lossless, this must be the inverse of the [`OperandResolver`] used to
/// disassemble the code.
pub trait OperandBuilder {
    type Member;
    type Variable;
    type Parameter;

    fn member_token(&mut self, member: &Self::Member) -> Token;
    fn string_token(&mut self, string: &str) -> Token;
    fn local_index(&mut self, local: &Self::Variable) -> u16;
    fn parameter_index(&mut self, parameter: &Self::Parameter) -> u16;
}

impl<R: OperandResolver + ?Sized> OperandResolver for &R {
    type Member = R::Member;
    type Variable = R::Variable;
    type Parameter = R::Parameter;

    fn resolve_member(&self, token: Token) -> Option<Self::Member> {
        (**self).resolve_member(token)
    }

    fn resolve_string(&self, token: Token) -> Option<String> {
        (**self).resolve_string(token)
    }

    fn resolve_local(&self, index: u16) -> Option<Self::Variable> {
        (**self).resolve_local(index)
    }

    fn resolve_parameter(&self, index: u16) -> Option<Self::Parameter> {
        (**self).resolve_parameter(index)
    }
}

impl<B: OperandBuilder + ?Sized> OperandBuilder for &mut B {
    type Member = B::Member;
    type Variable = B::Variable;
    type Parameter = B::Parameter;

    fn member_token(&mut self, member: &Self::Member) -> Token {
        (**self).member_token(member)
    }

    fn string_token(&mut self, string: &str) -> Token {
        (**self).string_token(string)
    }

    fn local_index(&mut self, local: &Self::Variable) -> u16 {
        (**self).local_index(local)
    }

    fn parameter_index(&mut self, parameter: &Self::Parameter) -> u16 {
        (**self).parameter_index(parameter)
    }
}

/// Operands that stay as raw tokens and indices, except for user strings
///
/// User strings are resolved from (and interned into) an in-memory table, so code can be built
/// with literal strings and still assemble to `ldstr` tokens.
#[derive(Clone, Debug, Default)]
pub struct RawOperands {
    user_strings: BTreeMap<Token, String>,
}

impl RawOperands {
    pub fn new() -> RawOperands {
        RawOperands::default()
    }

    /// Register a known user string
    pub fn with_user_string(mut self, token: Token, string: impl Into<String>) -> RawOperands {
        self.user_strings.insert(token, string.into());
        self
    }

    pub fn user_strings(&self) -> impl Iterator<Item = (Token, &str)> {
        self.user_strings
            .iter()
            .map(|(token, string)| (*token, string.as_str()))
    }
}

impl OperandResolver for RawOperands {
    type Member = Token;
    type Variable = u16;
    type Parameter = u16;

    fn resolve_member(&self, _token: Token) -> Option<Token> {
        None
    }

    fn resolve_string(&self, token: Token) -> Option<String> {
        self.user_strings.get(&token).cloned()
    }

    fn resolve_local(&self, _index: u16) -> Option<u16> {
        None
    }

    fn resolve_parameter(&self, _index: u16) -> Option<u16> {
        None
    }
}

impl OperandBuilder for RawOperands {
    type Member = Token;
    type Variable = u16;
    type Parameter = u16;

    fn member_token(&mut self, member: &Token) -> Token {
        *member
    }

    fn string_token(&mut self, string: &str) -> Token {
        if let Some((token, _)) = self.user_strings.iter().find(|(_, s)| s.as_str() == string) {
            return *token;
        }
        let next_rid = self
            .user_strings
            .keys()
            .next_back()
            .map_or(1, |token| token.rid() + 1);
        let token = Token::new(Token::USER_STRING_TABLE, next_rid);
        self.user_strings.insert(token, string.to_owned());
        token
    }

    fn local_index(&mut self, local: &u16) -> u16 {
        *local
    }

    fn parameter_index(&mut self, parameter: &u16) -> u16 {
        *parameter
    }
}
