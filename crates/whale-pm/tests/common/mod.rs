//! Shared fixtures: an in-process package registry and `.nupkg` builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tiny_http::{Response, Server, StatusCode};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A declared dependency: `(target framework, id, version range)`.
///
/// Consecutive dependencies with the same framework share a `<group>`; a
/// `None` framework is written as a flat `<dependency>`.
pub type Dep<'a> = (Option<&'a str>, &'a str, Option<&'a str>);

/// Build nuspec XML for `id`
pub fn nuspec(id: &str, version: &str, deps: &[Dep]) -> String {
    let mut body = String::new();
    let mut open_group: Option<&str> = None;

    for (framework, dep, range) in deps {
        if open_group.is_some() && open_group != *framework {
            body.push_str("</group>");
            open_group = None;
        }
        if let Some(tfm) = framework {
            if open_group.is_none() {
                body.push_str(&format!("<group targetFramework=\"{tfm}\">"));
                open_group = Some(*tfm);
            }
        }
        match range {
            Some(range) => body.push_str(&format!("<dependency id=\"{dep}\" version=\"{range}\" />")),
            None => body.push_str(&format!("<dependency id=\"{dep}\" />")),
        }
    }
    if open_group.is_some() {
        body.push_str("</group>");
    }

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://schemas.microsoft.com/packaging/2013/05/nuspec.xsd">
  <metadata>
    <id>{id}</id>
    <version>{version}</version>
    <authors>test</authors>
    <dependencies>{body}</dependencies>
  </metadata>
</package>"#
    )
}

/// A `.nupkg` (zip) with the given entries
pub fn nupkg(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// A typical package: descriptor at the root plus one library file
pub fn simple_nupkg(id: &str, version: &str, deps: &[Dep]) -> Vec<u8> {
    let descriptor = nuspec(id, version, deps);
    let descriptor_name = format!("{id}.nuspec");
    let dll_name = format!("lib/net472/{id}.dll");
    let dll: &[u8] = b"MZ\x90\x00fake";
    nupkg(&[(descriptor_name.as_str(), descriptor.as_bytes()), (dll_name.as_str(), dll)])
}

/// Serves registered packages at `/<id>` and `/<id>/<version>`; anything else is a 404.
pub struct FakeRegistry {
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
    requests: Arc<Mutex<Vec<String>>>,
    base_url: String,
}

impl FakeRegistry {
    pub fn start(packages: Vec<(&str, Option<&str>, Vec<u8>)>) -> Self {
        let mut routes = HashMap::new();
        for (id, version, body) in packages {
            let path = match version {
                Some(version) => format!("/{id}/{version}"),
                None => format!("/{id}"),
            };
            routes.insert(path.to_lowercase(), body);
        }

        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                for request in server.incoming_requests() {
                    let path = request.url().to_string();
                    requests.lock().unwrap().push(path.clone());
                    let response = match routes.get(&path.to_lowercase()) {
                        Some(body) => Response::from_data(body.clone()).boxed(),
                        None => Response::from_string("not found").with_status_code(StatusCode(404)).boxed(),
                    };
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            server,
            handle: Some(handle),
            requests,
            base_url: format!("http://{addr}/"),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Paths requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeRegistry {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
