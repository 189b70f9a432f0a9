//! Topic discovery against a running ROS master.
//!
//! The master speaks XML-RPC over HTTP. Only the two calls needed to map
//! active topics to their message types are implemented:
//! `getSystemState` (publishers and subscribers per topic) and
//! `getTopicTypes` (type per published topic).

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use msg2capnp_compiler::ProviderError;
use msg2capnp_schema::QualifiedType;
use regex::Regex;
use tracing::{debug, info, warn};

pub const DEFAULT_MASTER_URI: &str = "http://localhost:11311";
pub const CALLER_ID: &str = "/msg2capnp";

lazy_static! {
    static ref XML_TOKEN: Regex = Regex::new(
        r"(<\?[^>]*\?>|<!--.*?-->)|<(/)?([A-Za-z0-9_.]+)[^>]*?(/)?>|([^<]+)"
    ).unwrap();
}

/// An XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
    Str(String),
    Array(Vec<Value>),
    Struct(Vec<(String, Value)>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum XmlToken {
    Open(String),
    Close(String),
    Empty(String),
    Text(String),
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn tokenize_xml(text: &str) -> Vec<XmlToken> {
    let mut tokens = Vec::new();
    for caps in XML_TOKEN.captures_iter(text) {
        if caps.get(1).is_some() {
            continue;
        }
        if let Some(body) = caps.get(5) {
            tokens.push(XmlToken::Text(unescape(body.as_str())));
            continue;
        }
        let name = caps[3].to_string();
        let token = if caps.get(2).is_some() {
            XmlToken::Close(name)
        } else if caps.get(4).is_some() {
            XmlToken::Empty(name)
        } else {
            XmlToken::Open(name)
        };
        tokens.push(token);
    }
    tokens
}

fn invalid(msg: &str) -> ProviderError {
    ProviderError::Unavailable(format!("Malformed XML-RPC response: {}", msg))
}

struct XmlRpcParser {
    tokens: Vec<XmlToken>,
    index:  usize,
}

impl XmlRpcParser {
    fn new(text: &str) -> Self {
        XmlRpcParser {
            tokens: tokenize_xml(text),
            index:  0,
        }
    }

    fn peek_raw(&self) -> Option<&XmlToken> {
        self.tokens.get(self.index)
    }

    /// Next token that is not inter-element whitespace.
    fn peek(&mut self) -> Option<&XmlToken> {
        while let Some(XmlToken::Text(text)) = self.tokens.get(self.index) {
            if !text.trim().is_empty() {
                break;
            }
            self.index += 1;
        }
        self.tokens.get(self.index)
    }

    fn next(&mut self) -> Option<XmlToken> {
        self.peek()?;
        let token = self.tokens.get(self.index).cloned();
        self.index += 1;
        token
    }

    fn expect_open(&mut self, name: &str) -> Result<(), ProviderError> {
        match self.next() {
            Some(XmlToken::Open(ref n)) if n == name => Ok(()),
            other => Err(invalid(&format!("expected <{}> but found {:?}", name, other))),
        }
    }

    fn expect_close(&mut self, name: &str) -> Result<(), ProviderError> {
        match self.next() {
            Some(XmlToken::Close(ref n)) if n == name => Ok(()),
            other => Err(invalid(&format!("expected </{}> but found {:?}", name, other))),
        }
    }

    /// Raw text up to the closing `name` tag; whitespace is significant here.
    fn text_until_close(&mut self, name: &str) -> Result<String, ProviderError> {
        let mut text = String::new();
        if let Some(XmlToken::Text(t)) = self.peek_raw() {
            text = t.clone();
            self.index += 1;
        }
        self.expect_close(name)?;
        Ok(text)
    }

    fn parse_value(&mut self) -> Result<Value, ProviderError> {
        match self.next() {
            Some(XmlToken::Empty(ref n)) if n == "value" => return Ok(Value::Str(String::new())),
            Some(XmlToken::Open(ref n)) if n == "value" => {}
            other => return Err(invalid(&format!("expected <value> but found {:?}", other))),
        }

        // Untyped values are strings.
        if let Some(XmlToken::Text(t)) = self.peek_raw() {
            let text = t.clone();
            self.index += 1;
            if matches!(self.peek_raw(), Some(XmlToken::Close(n)) if n == "value") {
                self.index += 1;
                return Ok(Value::Str(text));
            }
            if !text.trim().is_empty() {
                return Err(invalid(&format!("unexpected text {:?}", text)));
            }
        }

        let value = match self.next() {
            Some(XmlToken::Close(ref n)) if n == "value" => return Ok(Value::Str(String::new())),
            Some(XmlToken::Empty(kind)) => match kind.as_str() {
                "string" => Value::Str(String::new()),
                "array" => Value::Array(Vec::new()),
                "struct" => Value::Struct(Vec::new()),
                other => return Err(invalid(&format!("empty <{}/>", other))),
            },
            Some(XmlToken::Open(kind)) => match kind.as_str() {
                "string" => Value::Str(self.text_until_close("string")?),
                "int" | "i4" | "i8" => {
                    let text = self.text_until_close(&kind)?;
                    let n = text.trim().parse().map_err(|_| invalid(&format!("bad integer {:?}", text)))?;
                    Value::Int(n)
                }
                "boolean" => {
                    let text = self.text_until_close("boolean")?;
                    Value::Bool(text.trim() == "1")
                }
                "double" => {
                    let text = self.text_until_close("double")?;
                    let n = text.trim().parse().map_err(|_| invalid(&format!("bad double {:?}", text)))?;
                    Value::Double(n)
                }
                "array" => self.parse_array()?,
                "struct" => self.parse_struct()?,
                other => return Err(invalid(&format!("unsupported type <{}>", other))),
            },
            other => return Err(invalid(&format!("expected a typed value but found {:?}", other))),
        };

        self.expect_close("value")?;
        Ok(value)
    }

    fn parse_array(&mut self) -> Result<Value, ProviderError> {
        let mut values = Vec::new();
        match self.next() {
            Some(XmlToken::Empty(ref n)) if n == "data" => {}
            Some(XmlToken::Open(ref n)) if n == "data" => {
                while !matches!(self.peek(), Some(XmlToken::Close(n)) if n == "data") {
                    values.push(self.parse_value()?);
                }
                self.expect_close("data")?;
            }
            other => return Err(invalid(&format!("expected <data> but found {:?}", other))),
        }
        self.expect_close("array")?;
        Ok(Value::Array(values))
    }

    fn parse_struct(&mut self) -> Result<Value, ProviderError> {
        let mut members = Vec::new();
        while matches!(self.peek(), Some(XmlToken::Open(n)) if n == "member") {
            self.expect_open("member")?;
            self.expect_open("name")?;
            let name = self.text_until_close("name")?;
            let value = self.parse_value()?;
            self.expect_close("member")?;
            members.push((name, value));
        }
        self.expect_close("struct")?;
        Ok(Value::Struct(members))
    }

    fn parse_response(&mut self) -> Result<Value, ProviderError> {
        self.expect_open("methodResponse")?;
        match self.next() {
            Some(XmlToken::Open(ref n)) if n == "params" => {
                self.expect_open("param")?;
                let value = self.parse_value()?;
                self.expect_close("param")?;
                self.expect_close("params")?;
                Ok(value)
            }
            Some(XmlToken::Open(ref n)) if n == "fault" => {
                let fault = self.parse_value()?;
                Err(ProviderError::Unavailable(format!("XML-RPC fault: {:?}", fault)))
            }
            other => Err(invalid(&format!("expected <params> but found {:?}", other))),
        }
    }
}

/// Parses a `methodResponse` document into its single return value.
pub fn parse_response(text: &str) -> Result<Value, ProviderError> {
    XmlRpcParser::new(text).parse_response()
}

/// Builds a `methodCall` document with string parameters.
pub fn method_call(method: &str, params: &[&str]) -> String {
    let mut xml: Vec<String> = Vec::new();
    xml.push("<?xml version=\"1.0\"?>".to_string());
    xml.push("<methodCall>".to_string());
    xml.push(format!("<methodName>{}</methodName>", escape(method)));
    xml.push("<params>".to_string());
    for param in params {
        xml.push(format!("<param><value><string>{}</string></value></param>", escape(param)));
    }
    xml.push("</params>".to_string());
    xml.push("</methodCall>".to_string());
    xml.join("\n")
}

/// ROS master APIs answer `[code, statusMessage, payload]`; code 1 is success.
fn master_payload(response: Value, method: &str) -> Result<Value, ProviderError> {
    let triple = match response {
        Value::Array(values) if values.len() == 3 => values,
        other => return Err(invalid(&format!("{} returned {:?}", method, other))),
    };
    let code = triple[0].as_int().unwrap_or(-1);
    if code != 1 {
        let status = triple[1].as_str().unwrap_or_default();
        return Err(ProviderError::Unavailable(format!("{} failed ({}): {}", method, code, status)));
    }
    triple
        .into_iter()
        .nth(2)
        .ok_or_else(|| invalid(&format!("{} returned no payload", method)))
}

/// Topic names listed in the publisher and subscriber sections of a
/// `getSystemState` payload, deduplicated.
pub fn topics_from_system_state(state: &Value) -> Result<Vec<String>, ProviderError> {
    let sections = state
        .as_array()
        .ok_or_else(|| invalid("system state is not an array"))?;

    let mut topics: Vec<String> = Vec::new();
    // publishers, subscribers; services are not topics
    for section in sections.iter().take(2) {
        let entries = section
            .as_array()
            .ok_or_else(|| invalid("system state section is not an array"))?;
        for entry in entries {
            let topic = entry
                .as_array()
                .and_then(|pair| pair.first())
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("system state entry has no topic name"))?;
            if !topics.iter().any(|t| t == topic) {
                topics.push(topic.to_string());
            }
        }
    }
    Ok(topics)
}

/// `topic → type` pairs of a `getTopicTypes` payload.
pub fn topic_types(payload: &Value) -> Result<BTreeMap<String, String>, ProviderError> {
    let pairs = payload
        .as_array()
        .ok_or_else(|| invalid("topic types are not an array"))?;
    let mut types = BTreeMap::new();
    for pair in pairs {
        match pair.as_array() {
            Some([topic, ty]) => {
                if let (Some(topic), Some(ty)) = (topic.as_str(), ty.as_str()) {
                    types.insert(topic.to_string(), ty.to_string());
                }
            }
            _ => return Err(invalid("topic type entry is not a pair")),
        }
    }
    Ok(types)
}

/// Maps every active topic to its message type, keeping each type once.
pub fn live_types(
    topics: &[String],
    types: &BTreeMap<String, String>,
) -> Vec<QualifiedType> {
    let mut seeds: Vec<QualifiedType> = Vec::new();
    for topic in topics {
        let ty = match types.get(topic) {
            Some(ty) => ty,
            None => {
                warn!("No type known for topic {}", topic);
                continue;
            }
        };
        match ty.parse::<QualifiedType>() {
            Ok(ty) => {
                if !seeds.contains(&ty) {
                    seeds.push(ty);
                }
            }
            Err(e) => warn!("Skipping topic {}: {}", topic, e),
        }
    }
    seeds
}

pub struct MasterClient {
    uri: String,
}

impl MasterClient {
    pub fn new(uri: impl Into<String>) -> Self {
        MasterClient { uri: uri.into() }
    }

    fn call(&self, method: &str) -> Result<Value, ProviderError> {
        debug!("Calling {} on ROS master {}", method, self.uri);
        let body = ureq::post(&self.uri)
            .header("Content-Type", "text/xml")
            .send(method_call(method, &[CALLER_ID]))
            .map_err(|e| {
                ProviderError::Unavailable(format!("Unable to communicate with master {}: {}", self.uri, e))
            })?
            .into_body()
            .read_to_string()
            .map_err(|e| {
                ProviderError::Unavailable(format!("Failed to read response from {}: {}", self.uri, e))
            })?;
        master_payload(parse_response(&body)?, method)
    }

    /// The unique message types of every topic with a publisher or subscriber.
    pub fn message_types(&self) -> Result<Vec<QualifiedType>, ProviderError> {
        let state = self.call("getSystemState")?;
        let topics = topics_from_system_state(&state)?;
        let types = topic_types(&self.call("getTopicTypes")?)?;

        let seeds = live_types(&topics, &types);
        info!("Discovered {} types on {} topics", seeds.len(), topics.len());
        Ok(seeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM_STATE: &str = r#"<?xml version="1.0"?>
<methodResponse><params><param>
<value><array><data>
  <value><i4>1</i4></value>
  <value><string>current system state</string></value>
  <value><array><data>
    <value><array><data>
      <value><string>/odom</string></value>
      <value><array><data><value><string>/driver</string></value></data></array></value>
    </data></array></value>
    <value><array><data>
      <value><string>/rosout</string></value>
      <value><array><data><value>/logger</value></data></array></value>
    </data></array></value>
  </data></array></value>
  <value><array><data>
    <value><array><data>
      <value><string>/odom</string></value>
      <value><array><data/></array></value>
    </data></array></value>
    <value><array><data>
      <value><string>/scan</string></value>
      <value><array><data/></array></value>
    </data></array></value>
  </data></array></value>
  <value><array><data/></array></value>
</data></array></value>
</param></params></methodResponse>
"#;

    const TOPIC_TYPES: &str = r#"<?xml version="1.0"?>
<methodResponse><params><param>
<value><array><data>
  <value><int>1</int></value>
  <value><string>current topics</string></value>
  <value><array><data>
    <value><array><data><value><string>/odom</string></value><value><string>nav_msgs/Odometry</string></value></data></array></value>
    <value><array><data><value><string>/rosout</string></value><value><string>rosgraph_msgs/Log</string></value></data></array></value>
    <value><array><data><value><string>/cmd</string></value><value><string>geometry_msgs/Twist</string></value></data></array></value>
  </data></array></value>
</data></array></value>
</param></params></methodResponse>
"#;

    #[test]
    fn test_parse_scalars() {
        let doc = "<methodResponse><params><param><value><struct>\
            <member><name>n</name><value><int>-4</int></value></member>\
            <member><name>ok</name><value><boolean>1</boolean></value></member>\
            <member><name>d</name><value><double>0.5</double></value></member>\
            <member><name>s</name><value><string>a &amp; b</string></value></member>\
            </struct></value></param></params></methodResponse>";
        let value = parse_response(doc).unwrap();
        assert_eq!(
            value,
            Value::Struct(vec![
                ("n".to_string(), Value::Int(-4)),
                ("ok".to_string(), Value::Bool(true)),
                ("d".to_string(), Value::Double(0.5)),
                ("s".to_string(), Value::Str("a & b".to_string())),
            ])
        );
    }

    #[test]
    fn test_live_type_discovery() {
        let state = master_payload(parse_response(SYSTEM_STATE).unwrap(), "getSystemState").unwrap();
        let topics = topics_from_system_state(&state).unwrap();
        assert_eq!(topics, vec!["/odom", "/rosout", "/scan"]);

        let types = master_payload(parse_response(TOPIC_TYPES).unwrap(), "getTopicTypes").unwrap();
        let types = topic_types(&types).unwrap();
        assert_eq!(types.len(), 3);

        let seeds = live_types(&topics, &types);
        let seeds: Vec<String> = seeds.iter().map(ToString::to_string).collect();
        assert_eq!(seeds, vec!["nav_msgs/Odometry", "rosgraph_msgs/Log"]);
    }

    #[test]
    fn test_master_error_code() {
        let doc = "<methodResponse><params><param><value><array><data>\
            <value><i4>-1</i4></value><value><string>bad caller</string></value><value><i4>0</i4></value>\
            </data></array></value></param></params></methodResponse>";
        let err = master_payload(parse_response(doc).unwrap(), "getSystemState").unwrap_err();
        assert!(err.to_string().contains("bad caller"));
    }

    #[test]
    fn test_fault_response() {
        let doc = "<methodResponse><fault><value><struct>\
            <member><name>faultCode</name><value><int>4</int></value></member>\
            </struct></value></fault></methodResponse>";
        assert!(matches!(parse_response(doc), Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn test_method_call() {
        let call = method_call("getSystemState", &[CALLER_ID]);
        assert!(call.contains("<methodName>getSystemState</methodName>"));
        assert!(call.contains("<value><string>/msg2capnp</string></value>"));
    }

    #[test]
    fn test_unreachable_master() {
        let client = MasterClient::new("http://127.0.0.1:1");
        assert!(matches!(client.message_types(), Err(ProviderError::Unavailable(_))));
    }
}
