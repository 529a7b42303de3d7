// # SOAP Envelopes
//
// Request bodies and response parsing for the two CUCM APIs the directory
// uses:
//
// - AXL `listPhone`: every phone name matching `SEP%`
// - RIS `selectCmDeviceExt`: registration state and IP for a set of names
//
// Responses are matched on element local names, so the namespace prefixes
// CUCM picks (`ns`, `ns1`, `soapenv`, ...) do not matter.

use itl_core::{Device, Error, Result};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

/// AXL endpoint, relative to the publisher base URL
pub const AXL_PATH: &str = "axl/";

/// RIS endpoint, relative to the publisher base URL
pub const RIS_PATH: &str = "realtimeservice2/services/RISService70";

/// RIS WSDL, fetched by the connectivity check
pub const RIS_WSDL_PATH: &str = "realtimeservice2/services/RISService70?wsdl";

/// Most devices a single `selectCmDeviceExt` call can select
pub const RIS_MAX_DEVICES: usize = 1000;

/// `SOAPAction` header for `listPhone`
pub fn list_phone_action(axl_version: &str) -> String {
    format!("CUCM:DB ver={} listPhone", axl_version)
}

/// `listPhone` request selecting every `SEP%` phone, returning name and model
pub fn list_phone_request(axl_version: &str) -> String {
    format!(
        r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:ns="http://www.cisco.com/AXL/API/{version}">
   <soapenv:Header/>
   <soapenv:Body>
      <ns:listPhone>
         <searchCriteria><name>SEP%</name></searchCriteria>
         <returnedTags><name></name><model></model></returnedTags>
      </ns:listPhone>
   </soapenv:Body>
</soapenv:Envelope>"#,
        version = escape(axl_version)
    )
}

/// `selectCmDeviceExt` request for registered phones among `names`
///
/// The caller keeps `names` at or below [`RIS_MAX_DEVICES`].
pub fn select_cm_device_request(names: &[String]) -> String {
    let mut items = String::with_capacity(names.len() * 64);
    for name in names {
        items.push_str("               <soap:item><soap:Item>");
        items.push_str(&escape(name.as_str()));
        items.push_str("</soap:Item></soap:item>\n");
    }

    format!(
        r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:soap="http://schemas.cisco.com/ast/soap">
   <soapenv:Header/>
   <soapenv:Body>
      <soap:selectCmDeviceExt>
         <soap:StateInfo></soap:StateInfo>
         <soap:CmSelectionCriteria>
            <soap:MaxReturnedDevices>{max}</soap:MaxReturnedDevices>
            <soap:DeviceClass>Phone</soap:DeviceClass>
            <soap:Model>255</soap:Model>
            <soap:Status>Registered</soap:Status>
            <soap:NodeName></soap:NodeName>
            <soap:SelectBy>Name</soap:SelectBy>
            <soap:SelectItems>
{items}            </soap:SelectItems>
            <soap:Protocol>Any</soap:Protocol>
            <soap:DownloadStatus>Any</soap:DownloadStatus>
         </soap:CmSelectionCriteria>
      </soap:selectCmDeviceExt>
   </soapenv:Body>
</soapenv:Envelope>"#,
        max = RIS_MAX_DEVICES,
        items = items
    )
}

/// Phone names from a `listPhone` response (`return/phone/name`)
pub fn parse_list_phone(xml: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();

    walk(xml, |node| {
        if let Node::Text(path, text) = node
            && path.ends_with(&["return", "phone", "name"])
            && !text.is_empty()
        {
            names.push(text);
        }
    })?;

    Ok(names)
}

/// Registered phones from a `selectCmDeviceExt` response
///
/// Reads `CmDevices/item/Name` and the first `CmDevices/item/IPAddress/item/IP`
/// of every device. Devices missing either are skipped.
pub fn parse_select_cm_device(xml: &str) -> Result<Vec<Device>> {
    const DEVICE: [&str; 2] = ["CmDevices", "item"];
    const NAME: [&str; 3] = ["CmDevices", "item", "Name"];
    const IP: [&str; 5] = ["CmDevices", "item", "IPAddress", "item", "IP"];

    let mut devices = Vec::new();
    let mut current: Option<(Option<String>, Option<String>)> = None;

    walk(xml, |node| match node {
        Node::Open(path) if path.ends_with(&DEVICE) => current = Some((None, None)),
        Node::Text(path, text) => {
            if let Some((name, ip)) = current.as_mut() {
                if path.ends_with(&NAME) {
                    name.get_or_insert(text);
                } else if path.ends_with(&IP) {
                    ip.get_or_insert(text);
                }
            }
        }
        Node::Close(path) if path.ends_with(&DEVICE) => match current.take() {
            Some((Some(name), Some(ip))) if !name.is_empty() && !ip.is_empty() => {
                devices.push(Device::new(name, ip));
            }
            Some((name, _)) => {
                tracing::debug!("Skipping RIS entry without name or IP: {:?}", name);
            }
            None => {}
        },
        _ => {}
    })?;

    Ok(devices)
}

/// `faultstring` of a SOAP fault, if the body is one
pub fn parse_fault(xml: &str) -> Option<String> {
    let mut fault = None;

    walk(xml, |node| {
        if let Node::Text(path, text) = node
            && path.ends_with(&["Fault", "faultstring"])
            && fault.is_none()
        {
            fault = Some(text);
        }
    })
    .ok()?;

    fault
}

/// Local names of the currently open elements
#[derive(Debug, Default)]
struct ElementPath(Vec<String>);

impl ElementPath {
    fn push(&mut self, local_name: &[u8]) {
        self.0.push(String::from_utf8_lossy(local_name).into_owned());
    }

    fn pop(&mut self) {
        self.0.pop();
    }

    fn ends_with(&self, suffix: &[&str]) -> bool {
        self.0.len() >= suffix.len()
            && self.0[self.0.len() - suffix.len()..]
                .iter()
                .zip(suffix)
                .all(|(open, wanted)| open == wanted)
    }
}

enum Node<'p> {
    Open(&'p ElementPath),
    Text(&'p ElementPath, String),
    Close(&'p ElementPath),
}

/// Stream a SOAP response through `visit`
///
/// Fails on malformed XML and on documents without `Envelope/Body`.
fn walk(xml: &str, mut visit: impl FnMut(Node<'_>)) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut path = ElementPath::default();
    let mut saw_body = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                path.push(e.local_name().as_ref());
                saw_body |= path.ends_with(&["Envelope", "Body"]);
                visit(Node::Open(&path));
            }
            Ok(Event::Empty(e)) => {
                path.push(e.local_name().as_ref());
                visit(Node::Open(&path));
                visit(Node::Close(&path));
                path.pop();
            }
            Ok(Event::End(_)) => {
                visit(Node::Close(&path));
                path.pop();
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| {
                    Error::xml(format!(
                        "Bad text at position {}: {}",
                        reader.buffer_position(),
                        e
                    ))
                })?;
                visit(Node::Text(&path, text.into_owned()));
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                visit(Node::Text(&path, text));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::xml(format!(
                    "Malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    if !saw_body {
        return Err(Error::xml("Response is not a SOAP envelope"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const AXL_RESPONSE: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <ns:listPhoneResponse xmlns:ns="http://www.cisco.com/AXL/API/10.0">
      <return>
        <phone uuid="{1}">
          <name>SEP001122334455</name>
          <model>Cisco 8841</model>
        </phone>
        <phone uuid="{2}">
          <name>SEPAABBCCDDEEFF</name>
          <model>Cisco 7841</model>
        </phone>
        <phone uuid="{3}">
          <name/>
          <model>Cisco 7841</model>
        </phone>
      </return>
    </ns:listPhoneResponse>
  </soapenv:Body>
</soapenv:Envelope>"#;

    const RIS_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <ns1:selectCmDeviceResponse xmlns:ns1="http://schemas.cisco.com/ast/soap">
      <ns1:selectCmDeviceReturn>
        <ns1:SelectCmDeviceResult>
          <ns1:TotalDevicesFound>3</ns1:TotalDevicesFound>
          <ns1:CmNodes>
            <ns1:item>
              <ns1:ReturnCode>Ok</ns1:ReturnCode>
              <ns1:Name>cucm-pub</ns1:Name>
              <ns1:CmDevices>
                <ns1:item>
                  <ns1:Name>SEP001122334455</ns1:Name>
                  <ns1:DirNumber>1001-Registered</ns1:DirNumber>
                  <ns1:IPAddress>
                    <ns1:item>
                      <ns1:IP>10.0.0.1</ns1:IP>
                      <ns1:IPAddrType>ipv4</ns1:IPAddrType>
                    </ns1:item>
                    <ns1:item>
                      <ns1:IP>10.9.9.9</ns1:IP>
                      <ns1:IPAddrType>ipv4</ns1:IPAddrType>
                    </ns1:item>
                  </ns1:IPAddress>
                </ns1:item>
                <ns1:item>
                  <ns1:Name>SEPAABBCCDDEEFF</ns1:Name>
                  <ns1:IPAddress/>
                </ns1:item>
              </ns1:CmDevices>
            </ns1:item>
            <ns1:item>
              <ns1:ReturnCode>Ok</ns1:ReturnCode>
              <ns1:Name>cucm-sub1</ns1:Name>
              <ns1:CmDevices>
                <ns1:item>
                  <ns1:Name>SEP665544332211</ns1:Name>
                  <ns1:IPAddress>
                    <ns1:item>
                      <ns1:IP>10.0.0.2</ns1:IP>
                    </ns1:item>
                  </ns1:IPAddress>
                </ns1:item>
              </ns1:CmDevices>
            </ns1:item>
          </ns1:CmNodes>
        </ns1:SelectCmDeviceResult>
      </ns1:selectCmDeviceReturn>
    </ns1:selectCmDeviceResponse>
  </soapenv:Body>
</soapenv:Envelope>"#;

    #[test]
    fn test_parse_list_phone() {
        let names = parse_list_phone(AXL_RESPONSE).unwrap();
        assert_eq!(names, vec!["SEP001122334455", "SEPAABBCCDDEEFF"]);
    }

    #[test]
    fn test_parse_select_cm_device() {
        let devices = parse_select_cm_device(RIS_RESPONSE).unwrap();

        assert_eq!(devices.len(), 2, "Entry without IP is skipped");
        assert_eq!(devices[0].name(), "SEP001122334455");
        assert_eq!(devices[0].ip_address(), "10.0.0.1", "First IP wins");
        assert_eq!(devices[1].name(), "SEP665544332211");
        assert_eq!(devices[1].ip_address(), "10.0.0.2");
    }

    #[test]
    fn test_node_names_are_not_devices() {
        let devices = parse_select_cm_device(RIS_RESPONSE).unwrap();
        assert!(devices.iter().all(|d| !d.name().starts_with("cucm")));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let result = parse_list_phone("<soapenv:Envelope><soapenv:Body><return></soapenv:Body>");
        assert!(matches!(result, Err(Error::Xml(_))));
    }

    #[test]
    fn test_non_soap_body_is_an_error() {
        let result = parse_select_cm_device("<html><body>Login</body></html>");
        assert!(matches!(result, Err(Error::Xml(_))));
    }

    #[test]
    fn test_parse_fault() {
        let fault = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <soapenv:Fault>
      <faultcode>soapenv:Client</faultcode>
      <faultstring>Item not valid: The specified Version was not found</faultstring>
    </soapenv:Fault>
  </soapenv:Body>
</soapenv:Envelope>"#;

        assert_eq!(
            parse_fault(fault).as_deref(),
            Some("Item not valid: The specified Version was not found")
        );
        assert_eq!(parse_fault(AXL_RESPONSE), None);
        assert_eq!(parse_fault("not xml at all"), None);
    }

    #[test]
    fn test_list_phone_request() {
        let body = list_phone_request("12.5");
        assert!(body.contains(r#"xmlns:ns="http://www.cisco.com/AXL/API/12.5""#));
        assert!(body.contains("<name>SEP%</name>"));
        assert_eq!(list_phone_action("12.5"), "CUCM:DB ver=12.5 listPhone");
    }

    #[test]
    fn test_select_request_escapes_names() {
        let names = vec!["SEP001".to_string(), "SEP<&>".to_string()];
        let body = select_cm_device_request(&names);

        assert!(body.contains("<soap:Item>SEP001</soap:Item>"));
        assert!(body.contains("<soap:Item>SEP&lt;&amp;&gt;</soap:Item>"));
        assert!(body.contains("<soap:MaxReturnedDevices>1000</soap:MaxReturnedDevices>"));
        assert!(body.contains("<soap:Status>Registered</soap:Status>"));
    }
}
