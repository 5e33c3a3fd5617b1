//! Resolver configuration
//!
//! The system resolver configuration, normally read from the system’s
//! `/etc/resolv.conf`, contains the name servers to query, the search list
//! for relative names, and a set of options. Only the parts that matter to
//! this resolver are kept, everything else in the file is accepted and
//! ignored, modeled along the lines of glibc’s resolver.

use crate::base::name;
use std::io::{self, BufRead, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::str::SplitWhitespace;
use std::time::Duration;
use std::{error, fmt, fs};

//------------ ResolvConf ---------------------------------------------------

/// Resolver configuration.
///
/// The type follows the builder pattern. After creating a value with
/// `ResolvConf::new()` you can manipulate the members. Once you are happy
/// with them, you call `finalize()` to make sure the configuration is valid.
/// It mostly just fixes the `servers`.
///
/// Additionally, the type can parse a glibc-style configuration file,
/// commonly known as `/etc/resolv.conf` through the `parse()` and
/// `parse_file()` methods. You still need to call `finalize()` after
/// parsing.
///
/// The easiest way, however, to get the system resolver configuration is
/// through `ResolvConf::default()`. This will parse the configuration file
/// or return a default configuration if that fails.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvConf {
    /// Addresses of servers to query.
    pub servers: Vec<SocketAddr>,

    /// Search list for host-name lookup.
    ///
    /// Names are kept normalized. The empty string is the root.
    pub search: Vec<String>,

    /// Number of dots before an initial absolute query is made.
    pub ndots: usize,

    /// Timeout to wait for a response.
    pub timeout: Duration,

    /// Number of retries before giving up.
    pub attempts: usize,

    /// Use round-robin selection of name servers.
    pub rotate: bool,
}

/// # Management
///
impl ResolvConf {
    /// Creates a new, empty configuration.
    ///
    /// Using an empty configuration will fail since it does not contain
    /// any name servers. Call `self.finalize()` to make it usable.
    pub fn new() -> Self {
        ResolvConf {
            servers: Vec::new(),
            search: Vec::new(),
            ndots: 1,
            timeout: Duration::from_secs(5),
            attempts: 2,
            rotate: false,
        }
    }

    /// Creates a configuration using the given servers.
    ///
    /// The configuration is already finalized.
    pub fn with_servers(servers: impl IntoIterator<Item = SocketAddr>) -> Self {
        let mut res = Self::new();
        res.servers.extend(servers);
        res.finalize();
        res
    }

    /// Finalizes the configuration for actual use.
    ///
    /// The function does two things. If `servers` is empty, it adds
    /// `127.0.0.1:53`. This is exactly what glibc does. If `search` is
    /// empty, it adds the root domain. This differs from what glibc does
    /// which considers the machine’s host name.
    pub fn finalize(&mut self) {
        if self.servers.is_empty() {
            // glibc just simply uses 127.0.0.1:53. Let's do that, too,
            // and claim it is for compatibility.
            let addr = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
            self.servers.push(SocketAddr::new(addr, 53));
        }
        if self.search.is_empty() {
            self.search.push(String::new())
        }
    }

    /// Creates a default configuration for this system.
    ///
    /// This currently only works for Unix-y systems. Elsewhere, or if the
    /// file can’t be read, the finalized empty configuration is used.
    pub fn system() -> Self {
        let mut res = ResolvConf::new();
        let _ = res.parse_file("/etc/resolv.conf");
        res.finalize();
        res
    }

    /// Returns the names to try for `label`, in order.
    ///
    /// Absolute names, i.e., those ending in a dot, are only tried as is.
    /// Names with fewer dots than `ndots` are tried with each entry of the
    /// search list appended first and then as is. All other names are only
    /// tried as is. The returned names are normalized and unique.
    pub fn candidates(&self, label: &str) -> Vec<String> {
        let normal = name::normalize(label);
        if label.ends_with('.') || name::dot_count(label) >= self.ndots {
            return vec![normal];
        }
        let mut res = Vec::with_capacity(self.search.len() + 1);
        for suffix in &self.search {
            let candidate = if suffix.is_empty() {
                normal.clone()
            } else {
                format!("{}.{}", normal, suffix)
            };
            if !res.contains(&candidate) {
                res.push(candidate)
            }
        }
        if !res.contains(&normal) {
            res.push(normal)
        }
        res
    }
}

//--- Default

impl Default for ResolvConf {
    fn default() -> Self {
        Self::system()
    }
}

/// # Parsing Configuration File
///
impl ResolvConf {
    /// Parses the configuration from a file.
    pub fn parse_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let mut file = fs::File::open(path)?;
        self.parse(&mut file)
    }

    /// Parses the configuration from a reader.
    ///
    /// The format is that of the /etc/resolv.conf file.
    pub fn parse<R: Read>(&mut self, reader: &mut R) -> Result<(), Error> {
        for line in io::BufReader::new(reader).lines() {
            let line = line?;
            let line = line.trim_end();

            if line.is_empty()
                || line.starts_with(';')
                || line.starts_with('#')
            {
                continue;
            }

            let mut words = line.split_whitespace();
            let keyword = words.next();
            match keyword {
                Some("nameserver") => self.parse_nameserver(words)?,
                Some("domain") => self.parse_domain(words)?,
                Some("search") => self.parse_search(words)?,
                Some("sortlist") => {}
                Some("options") => self.parse_options(words)?,
                _ => return Err(Error::ParseError),
            }
        }
        Ok(())
    }

    fn parse_nameserver(
        &mut self,
        mut words: SplitWhitespace,
    ) -> Result<(), Error> {
        let addr = next_word(&mut words)?;
        // Scoped IPv6 addresses and the like fail parsing as an IpAddr
        // but may still be resolvable as socket addresses.
        match addr.parse::<IpAddr>() {
            Ok(addr) => self.servers.push(SocketAddr::new(addr, 53)),
            Err(_) => {
                for addr in (addr, 53).to_socket_addrs()? {
                    self.servers.push(addr)
                }
            }
        }
        no_more_words(words)
    }

    fn parse_domain(
        &mut self,
        mut words: SplitWhitespace,
    ) -> Result<(), Error> {
        let domain = parse_search_name(next_word(&mut words)?)?;
        self.search = vec![domain];
        no_more_words(words)
    }

    fn parse_search(&mut self, words: SplitWhitespace) -> Result<(), Error> {
        let mut search = Vec::new();
        for word in words {
            search.push(parse_search_name(word)?)
        }
        self.search = search;
        Ok(())
    }

    fn parse_options(&mut self, words: SplitWhitespace) -> Result<(), Error> {
        for word in words {
            match split_arg(word)? {
                ("ndots", Some(n)) => self.ndots = n,
                ("timeout", Some(n)) => {
                    self.timeout = Duration::from_secs(n as u64)
                }
                ("attempts", Some(n)) => self.attempts = n,
                ("rotate", None) => self.rotate = true,
                // Ignore unknown or misformated options.
                _ => {}
            }
        }
        Ok(())
    }
}

//--- Display

impl fmt::Display for ResolvConf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for server in &self.servers {
            if server.port() == 53 {
                writeln!(f, "nameserver {}", server.ip())?;
            } else {
                writeln!(f, "nameserver {}", server)?;
            }
        }
        let search: Vec<_> =
            self.search.iter().filter(|name| !name.is_empty()).collect();
        if search.len() == 1 {
            writeln!(f, "domain {}", search[0])?;
        } else if search.len() > 1 {
            f.write_str("search")?;
            for name in search {
                write!(f, " {}", name)?;
            }
            f.write_str("\n")?;
        }

        // Collect options so we only print them if there are any non-default
        // ones.
        let mut options = Vec::new();
        if self.ndots != 1 {
            options.push(format!("ndots:{}", self.ndots));
        }
        if self.timeout != Duration::from_secs(5) {
            options.push(format!("timeout:{}", self.timeout.as_secs()));
        }
        if self.attempts != 2 {
            options.push(format!("attempts:{}", self.attempts));
        }
        if self.rotate {
            options.push("rotate".into())
        }
        if !options.is_empty() {
            writeln!(f, "options {}", options.join(" "))?;
        }
        Ok(())
    }
}

//------------ Private Helpers ----------------------------------------------
//
// These are here to wrap stuff into Results.

/// Returns a reference to the next word or an error.
fn next_word<'a>(words: &mut SplitWhitespace<'a>) -> Result<&'a str, Error> {
    match words.next() {
        Some(word) => Ok(word),
        None => Err(Error::ParseError),
    }
}

/// Returns nothing but errors out if there are words left.
fn no_more_words(mut words: SplitWhitespace) -> Result<(), Error> {
    match words.next() {
        Some(..) => Err(Error::ParseError),
        None => Ok(()),
    }
}

/// Checks and normalizes a name for the search list.
fn parse_search_name(word: &str) -> Result<String, Error> {
    if name::compose_len(word).is_err() {
        return Err(Error::ParseError);
    }
    Ok(name::normalize(word))
}

/// Splits the name and argument from an option with arguments.
///
/// These options consist of a name followed by a colon followed by a
/// value, which so far is only `usize`, so we do that.
fn split_arg(s: &str) -> Result<(&str, Option<usize>), Error> {
    match s.find(':') {
        Some(idx) => {
            let (left, right) = s.split_at(idx);
            Ok((left, Some(right[1..].parse()?)))
        }
        None => Ok((s, None)),
    }
}

//------------ Error --------------------------------------------------------

/// The error that can happen when parsing `resolv.conf`.
#[derive(Debug)]
pub enum Error {
    /// The file is not a proper file.
    ParseError,

    /// Something happend while reading.
    IoError(io::Error),
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::IoError(error)
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(_: std::num::ParseIntError) -> Error {
        Error::ParseError
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::ParseError => f.write_str("error parsing configuration"),
            Error::IoError(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

//============ Testing ======================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::io;

    #[test]
    fn parse_resolv_conf() {
        let mut conf = ResolvConf::new();
        let data = "# generated\n\
                    nameserver 192.0.2.0\n\
                    nameserver 2001:db8::53\n\
                    search Example.com. corp.example\n\
                    sortlist 130.155.160.0/255.255.240.0\n\
                    options rotate ndots:2 timeout:3 edns0\n"
            .to_string();
        conf.parse(&mut io::Cursor::new(data)).unwrap();
        assert_eq!(
            conf.servers,
            vec![
                "192.0.2.0:53".parse::<SocketAddr>().unwrap(),
                "[2001:db8::53]:53".parse::<SocketAddr>().unwrap()
            ]
        );
        assert_eq!(conf.search, vec!["example.com", "corp.example"]);
        assert_eq!(conf.ndots, 2);
        assert_eq!(conf.timeout, Duration::from_secs(3));
        assert_eq!(conf.attempts, 2);
        assert!(conf.rotate);
    }

    #[test]
    fn domain_replaces_search() {
        let mut conf = ResolvConf::new();
        let data = "search a.example b.example\ndomain c.example\n";
        conf.parse(&mut io::Cursor::new(data)).unwrap();
        assert_eq!(conf.search, vec!["c.example"]);
    }

    #[test]
    fn reject_garbage() {
        let mut conf = ResolvConf::new();
        assert!(matches!(
            conf.parse(&mut io::Cursor::new("frobnicate yes\n")),
            Err(Error::ParseError)
        ));
        assert!(matches!(
            conf.parse(&mut io::Cursor::new("nameserver\n")),
            Err(Error::ParseError)
        ));
        assert!(matches!(
            conf.parse(&mut io::Cursor::new("options ndots:x\n")),
            Err(Error::ParseError)
        ));
    }

    #[test]
    fn finalize_empty() {
        let mut conf = ResolvConf::new();
        conf.finalize();
        assert_eq!(
            conf.servers,
            vec!["127.0.0.1:53".parse::<SocketAddr>().unwrap()]
        );
        assert_eq!(conf.search, vec![String::new()]);
    }

    #[test]
    fn display() {
        let mut conf = ResolvConf::new();
        conf.servers.push("192.0.2.1:53".parse().unwrap());
        conf.servers.push("192.0.2.2:5353".parse().unwrap());
        conf.search = vec!["example.com".into()];
        conf.ndots = 3;
        assert_eq!(
            conf.to_string(),
            "nameserver 192.0.2.1\n\
             nameserver 192.0.2.2:5353\n\
             domain example.com\n\
             options ndots:3\n"
        );
    }

    #[test]
    fn search_candidates() {
        let mut conf = ResolvConf::new();
        conf.search = vec!["example.com".into(), "".into()];
        assert_eq!(conf.candidates("www"), vec!["www.example.com", "www"]);
        assert_eq!(conf.candidates("www.Example.org"), vec!["www.example.org"]);
        assert_eq!(conf.candidates("www."), vec!["www"]);

        conf.ndots = 2;
        assert_eq!(
            conf.candidates("www.sub"),
            vec!["www.sub.example.com", "www.sub"]
        );
    }
}
