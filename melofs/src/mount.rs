//! Mount glue: translates kernel FUSE callbacks (inode-addressed) into the
//! path-addressed operations of [`CatalogFs`].

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, MountOption, ReplyAttr, ReplyData,
    ReplyDirectory, ReplyEntry, ReplyOpen, Request,
};
use libc::{EINVAL, ENOENT, c_int};
use log::info;

use crate::fs::path::split_path;
use crate::fs::{CatalogFs, EntryKind, FileAttributes};

const TTL: Duration = Duration::from_secs(1);
const ROOT_INODE: u64 = 1;

/// Inode-to-path bookkeeping around the path-based core. Inodes are handed
/// out on first sight of a path and never reclaimed; the tree is immutable
/// for the lifetime of the mount, so the table only ever grows to the size
/// of the catalog.
pub struct MountedFs {
    fs: CatalogFs,
    inode_to_path: HashMap<u64, String>,
    path_to_inode: HashMap<String, u64>,
    next_inode: u64,
}

impl MountedFs {
    pub fn new(fs: CatalogFs) -> Self {
        let mut inode_to_path = HashMap::new();
        let mut path_to_inode = HashMap::new();
        inode_to_path.insert(ROOT_INODE, "/".to_string());
        path_to_inode.insert("/".to_string(), ROOT_INODE);

        Self {
            fs,
            inode_to_path,
            path_to_inode,
            next_inode: ROOT_INODE + 1,
        }
    }

    fn inode_for(&mut self, path: &str) -> u64 {
        if let Some(ino) = self.path_to_inode.get(path) {
            return *ino;
        }

        let ino = self.next_inode;
        self.next_inode += 1;
        self.path_to_inode.insert(path.to_string(), ino);
        self.inode_to_path.insert(ino, path.to_string());
        ino
    }

    fn path_of(&self, ino: u64) -> Option<String> {
        self.inode_to_path.get(&ino).cloned()
    }

    fn to_fuse_attr(&self, ino: u64, attr: &FileAttributes) -> FileAttr {
        FileAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(512),
            atime: attr.mtime,
            mtime: attr.mtime,
            ctime: attr.mtime,
            crtime: attr.mtime,
            kind: match attr.kind {
                EntryKind::Directory => FileType::Directory,
                EntryKind::File => FileType::RegularFile,
            },
            perm: attr.perm,
            nlink: attr.nlink,
            uid: attr.uid,
            gid: attr.gid,
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn parent_path(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
    }
}

impl Filesystem for MountedFs {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        info!("melofs mounted and ready to serve");
        Ok(())
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(parent_path) = self.path_of(parent) else {
            reply.error(ENOENT);
            return;
        };
        let Some(name) = name.to_str() else {
            reply.error(ENOENT);
            return;
        };

        let path = child_path(&parent_path, name);
        match self.fs.getattr(&path) {
            Ok(attr) => {
                let ino = self.inode_for(&path);
                let attr = self.to_fuse_attr(ino, &attr);
                reply.entry(&TTL, &attr, 0);
            }
            Err(errno) => reply.error(errno),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
        let Some(path) = self.path_of(ino) else {
            reply.error(ENOENT);
            return;
        };

        match self.fs.getattr(&path) {
            Ok(attr) => reply.attr(&TTL, &self.to_fuse_attr(ino, &attr)),
            Err(errno) => reply.error(errno),
        }
    }

    fn readdir(&mut self, _req: &Request, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
        let Some(path) = self.path_of(ino) else {
            reply.error(ENOENT);
            return;
        };

        let names = match self.fs.readdir(&path) {
            Ok(names) => names,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };

        // everything under the root and under an artist is a directory;
        // album directories list regular files
        let depth = split_path(&path).len();
        let child_kind = if depth < 2 {
            FileType::Directory
        } else {
            FileType::RegularFile
        };

        for (i, name) in names.iter().enumerate().skip(offset as usize) {
            let (child_ino, kind) = match name.as_str() {
                "." => (ino, FileType::Directory),
                ".." => (self.inode_for(&parent_path(&path)), FileType::Directory),
                _ => (self.inode_for(&child_path(&path, name)), child_kind),
            };

            if reply.add(child_ino, (i + 1) as i64, kind, name) {
                break;
            }
        }

        reply.ok();
    }

    fn open(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        if self.inode_to_path.contains_key(&ino) {
            reply.opened(0, 0);
        } else {
            reply.error(ENOENT);
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = self.path_of(ino) else {
            reply.error(ENOENT);
            return;
        };
        if offset < 0 {
            reply.error(EINVAL);
            return;
        }

        match self.fs.read(&path, size as usize, offset as u64) {
            Ok(bytes) => reply.data(&bytes),
            Err(errno) => reply.error(errno),
        }
    }
}

/// Mount the filesystem read-only at `mountpoint` and serve callbacks until
/// it is unmounted.
pub fn mount(fs: CatalogFs, mountpoint: &Path) -> std::io::Result<()> {
    let options = [
        MountOption::RO,
        MountOption::FSName("melofs".to_string()),
        MountOption::DefaultPermissions,
        MountOption::AutoUnmount,
    ];

    fuser::mount2(MountedFs::new(fs), mountpoint, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_and_parent_paths() {
        assert_eq!(child_path("/", "The Owls"), "/The Owls");
        assert_eq!(child_path("/The Owls", "Night Flight"), "/The Owls/Night Flight");

        assert_eq!(parent_path("/The Owls/Night Flight"), "/The Owls");
        assert_eq!(parent_path("/The Owls"), "/");
        assert_eq!(parent_path("/"), "/");
    }
}
